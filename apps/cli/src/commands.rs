//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use leadpipe_campaign::SmartleadClient;
use leadpipe_contacts::{HunterClient, VerificationPolicy};
use leadpipe_copywriter::{
    AnthropicClient, CompanyClassifier, CopyGenerator, LlmClassifier, LlmCopywriter,
    TemplateCopywriter,
};
use leadpipe_core::{
    CandidateFilter, ExportOptions, IngestReport, ProgressReporter, RecordFailure,
    ScrapeConfig, ScrapeServices,
};
use leadpipe_jobsearch::{ApifyJobSource, JobSource, LinkedInGuestSource};
use leadpipe_shared::{
    AppConfig, CopyMode, JobSearchProvider, Prospect, ProspectStatus, config_file_path, init_config, init_config_at,
    load_config, load_config_from, require_env,
};
use leadpipe_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadPipe: find companies that are hiring, and email them.
#[derive(Parser)]
#[command(
    name = "leadpipe",
    version,
    about = "Scrape hiring companies, enrich them with a verified contact, and export personalized sequences.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Prospect database path (overrides `[store] path`).
    #[arg(long, env = "LEADPIPE_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Config file path (defaults to ~/.leadpipe/leadpipe.toml).
    #[arg(long, env = "LEADPIPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape, enrich and personalize new prospects.
    Ingest {
        /// Job titles to search for (comma-separated or repeated).
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Maximum number of unique companies to take from the scrape.
        #[arg(short, long)]
        count: Option<usize>,

        /// Search location.
        #[arg(short, long)]
        location: Option<String>,

        /// LinkedIn geo id for the location.
        #[arg(long)]
        geo_id: Option<String>,
    },

    /// Push ready prospects to the email campaign.
    Export {
        /// Export at most this many prospects.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show what would be exported without sending anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show prospect counts per status.
    Status,

    /// Database maintenance.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Database subcommands.
#[derive(Subcommand)]
pub(crate) enum DbAction {
    /// Drop and recreate the prospect table. Deletes every prospect.
    Reset {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadpipe=info",
        1 => "leadpipe=debug",
        _ => "leadpipe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        config_path: cli.config,
        db_path: cli.db,
    };

    match cli.command {
        Command::Ingest {
            keywords,
            count,
            location,
            geo_id,
        } => cmd_ingest(&ctx, keywords, count, location, geo_id).await,
        Command::Export { limit, dry_run } => cmd_export(&ctx, limit, dry_run).await,
        Command::Status => cmd_status(&ctx).await,
        Command::Db { action } => match action {
            DbAction::Reset { yes } => cmd_db_reset(&ctx, yes).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(&ctx).await,
            ConfigAction::Show => cmd_config_show(&ctx).await,
        },
    }
}

/// Global flags shared by every command.
struct Context {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

impl Context {
    fn load_config(&self) -> Result<AppConfig> {
        let config = match &self.config_path {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        Ok(config)
    }

    fn store_path(&self, config: &AppConfig) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => Ok(config.store.resolve_path()?),
        }
    }

    async fn open_storage(&self, config: &AppConfig) -> Result<(Storage, PathBuf)> {
        let path = self.store_path(config)?;
        info!(path = %path.display(), "opening prospect store");
        let storage = Storage::open(&path).await?;
        Ok((storage, path))
    }

    /// Open the store for commands that only read, never creating it.
    async fn open_storage_readonly(&self, config: &AppConfig) -> Result<(Storage, PathBuf)> {
        let path = self.store_path(config)?;
        if !path.exists() {
            return Err(eyre!(
                "no prospect store at {}; run `leadpipe ingest` first",
                path.display()
            ));
        }
        info!(path = %path.display(), "opening prospect store read-only");
        let storage = Storage::open_readonly(&path).await?;
        Ok((storage, path))
    }
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

async fn cmd_ingest(
    ctx: &Context,
    keywords: Vec<String>,
    count: Option<usize>,
    location: Option<String>,
    geo_id: Option<String>,
) -> Result<()> {
    let config = ctx.load_config()?;

    // Every credential is checked before any record is touched.
    let source: Box<dyn JobSource> = match config.job_search.provider {
        JobSearchProvider::Apify => {
            let token = require_env(&config.job_search.api_key_env, "Apify")?;
            Box::new(ApifyJobSource::new(&config.job_search, token)?)
        }
        JobSearchProvider::LinkedinGuest => Box::new(LinkedInGuestSource::new(&config.job_search)?),
    };
    let hunter_key = require_env(&config.contacts.api_key_env, "Hunter")?;
    let contacts = HunterClient::new(&config.contacts, hunter_key)?;

    let needs_llm = config.llm.copy_mode == CopyMode::Llm || config.filters.classify_b2c;
    let llm = if needs_llm {
        let key = require_env(&config.llm.api_key_env, "Anthropic")?;
        Some(AnthropicClient::new(&config.llm, key)?)
    } else {
        None
    };

    let classifier: Option<Box<dyn CompanyClassifier>> = match (&llm, config.filters.classify_b2c) {
        (Some(client), true) => Some(Box::new(LlmClassifier::new(client.clone()))),
        _ => None,
    };
    let generator: Box<dyn CopyGenerator> = match (config.llm.copy_mode, llm) {
        (CopyMode::Llm, Some(client)) => Box::new(LlmCopywriter::new(client)),
        _ => Box::new(TemplateCopywriter::new(config.llm.sender_name.clone())),
    };

    let scrape_config = ScrapeConfig {
        keywords: if keywords.is_empty() {
            config.defaults.keywords.clone()
        } else {
            keywords
        },
        count: count.unwrap_or(config.defaults.count),
        location: location.unwrap_or_else(|| config.defaults.location.clone()),
        geo_id: geo_id.unwrap_or_else(|| config.defaults.geo_id.clone()),
    };
    if scrape_config.keywords.is_empty() {
        return Err(eyre!("no keywords given and none configured in [defaults]"));
    }

    let (storage, _) = ctx.open_storage(&config).await?;
    let services = ScrapeServices {
        source: source.as_ref(),
        contacts: &contacts,
        classifier: classifier.as_deref(),
    };

    info!(
        keywords = scrape_config.keywords.len(),
        count = scrape_config.count,
        location = %scrape_config.location,
        provider = source.name(),
        "starting ingest"
    );

    let reporter = CliProgress::new();
    let result = leadpipe_core::run_ingest(
        &storage,
        &services,
        generator.as_ref(),
        &CandidateFilter::from_config(&config.filters),
        VerificationPolicy::from_config(&config.filters),
        &scrape_config,
        &reporter,
    )
    .await;
    reporter.finish();

    print_ingest(&result?);
    Ok(())
}

fn print_ingest(report: &IngestReport) {
    let scrape = &report.scrape;
    let enrich = &report.enrichment;
    let copy = &report.personalization;

    println!();
    println!("  Ingest complete in {:.1}s", report.elapsed.as_secs_f64());
    println!();
    println!("  Scrape");
    println!("    Postings:     {}", scrape.postings);
    println!("    Companies:    {}", scrape.companies);
    println!("    Inserted:     {}", scrape.inserted);
    println!("    Duplicates:   {}", scrape.duplicates);
    println!("    No domain:    {}", scrape.unresolved);
    println!("    Filtered out: {}", scrape.rejected.len());
    for (company, reason) in &scrape.rejected {
        println!("      - {company}: {reason}");
    }
    print_failures(&scrape.failures);
    println!("  Enrichment");
    println!("    Processed:    {}", enrich.processed);
    println!("    Enriched:     {}", enrich.enriched);
    println!("    Unverifiable: {}", enrich.unenrichable);
    println!("    No contact:   {}", enrich.not_found);
    print_failures(&enrich.failures);
    println!("  Personalization");
    println!("    Processed:    {}", copy.processed);
    println!("    Ready:        {}", copy.ready);
    print_failures(&copy.failures);
    println!();
}

fn print_failures(failures: &[RecordFailure]) {
    if failures.is_empty() {
        return;
    }
    println!("    Failed:       {}", failures.len());
    for failure in failures {
        println!("      - {}: {}", failure.subject, failure.message);
    }
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

async fn cmd_export(ctx: &Context, limit: Option<usize>, dry_run: bool) -> Result<()> {
    let config = ctx.load_config()?;

    if dry_run {
        let (storage, _) = ctx.open_storage_readonly(&config).await?;
        let preview = leadpipe_core::ready_for_export(&storage, limit).await?;
        print_preview(&preview);
        return Ok(());
    }

    let (storage, _) = ctx.open_storage(&config).await?;
    let options = ExportOptions { limit };
    let api_key = require_env(&config.campaign.api_key_env, "Smartlead")?;
    let campaign_id = require_env(&config.campaign.campaign_id_env, "Smartlead campaign")?;
    let sink = SmartleadClient::new(&config.campaign, api_key, campaign_id)?;

    let reporter = CliProgress::new();
    let result = leadpipe_core::run_export(&storage, &sink, options, &reporter).await;
    reporter.finish();
    let report = result?;

    println!();
    println!("  Export complete");
    println!("    Processed:    {}", report.processed);
    println!("    Added:        {}", report.added);
    println!("    Already in campaign: {}", report.already_in_campaign);
    print_failures(&report.failures);
    println!();
    Ok(())
}

fn print_preview(preview: &[Prospect]) {
    println!();
    if preview.is_empty() {
        println!("  Nothing to export.");
    } else {
        println!("  Would export {} prospect(s):", preview.len());
        for p in preview {
            println!(
                "    {:<30} {:<35} {}",
                p.company_domain,
                p.email.as_deref().unwrap_or("-"),
                p.subject_line.as_deref().unwrap_or("-"),
            );
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// status / db / config
// ---------------------------------------------------------------------------

async fn cmd_status(ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let (storage, path) = ctx.open_storage_readonly(&config).await?;
    let counts = storage.count_by_status().await?;
    let total = storage.count().await?;

    println!();
    println!("  Store: {}", path.display());
    for status in ProspectStatus::ALL {
        let n = counts.get(&status).copied().unwrap_or(0);
        println!("    {:<13} {n}", status.as_str());
    }
    println!("    {:<13} {total}", "total");
    println!();
    Ok(())
}

async fn cmd_db_reset(ctx: &Context, yes: bool) -> Result<()> {
    if !yes {
        return Err(eyre!(
            "this deletes every prospect; re-run with --yes to confirm"
        ));
    }
    let config = ctx.load_config()?;
    let (storage, path) = ctx.open_storage(&config).await?;
    let before = storage.count().await?;
    storage.reset().await?;
    println!("Dropped {before} prospect(s) and recreated the table in {}", path.display());
    Ok(())
}

async fn cmd_config_init(ctx: &Context) -> Result<()> {
    let target = match &ctx.config_path {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };
    if target.exists() {
        return Err(eyre!("config already exists at {}", target.display()));
    }
    let path = match &ctx.config_path {
        Some(path) => {
            init_config_at(path)?;
            path.clone()
        }
        None => init_config()?,
    };
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(ctx: &Context) -> Result<()> {
    let config: AppConfig = ctx.load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    phase: Mutex<String>,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self {
            spinner,
            phase: Mutex::new(String::new()),
        }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        if let Ok(mut phase) = self.phase.lock() {
            *phase = name.to_string();
        }
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, label: &str, current: usize, total: usize) {
        let phase = self.phase.lock().map(|p| p.clone()).unwrap_or_default();
        self.spinner
            .set_message(format!("{phase} [{current}/{total}] {label}"));
    }
}
