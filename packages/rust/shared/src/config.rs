//! Application configuration for LeadPipe.
//!
//! User config lives at `~/.leadpipe/leadpipe.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: each provider section names the
//! environment variable that holds its key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadPipeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadpipe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadpipe";

/// Default database file name inside the config directory.
const DB_FILE_NAME: &str = "prospects.db";

// ---------------------------------------------------------------------------
// Config structs (matching leadpipe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub job_search: JobSearchConfig,

    #[serde(default)]
    pub contacts: ContactsConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub campaign: CampaignConfig,

    #[serde(default)]
    pub filters: FiltersConfig,
}

/// `[defaults]` section: what `leadpipe ingest` does with no flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Job titles to search for. Companies hiring these roles have budget.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Maximum number of unique companies taken from one scrape.
    #[serde(default = "default_count")]
    pub count: usize,

    /// Search location.
    #[serde(default = "default_location")]
    pub location: String,

    /// LinkedIn geo id matching `location`.
    #[serde(default = "default_geo_id")]
    pub geo_id: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            count: default_count(),
            location: default_location(),
            geo_id: default_geo_id(),
        }
    }
}

fn default_keywords() -> Vec<String> {
    [
        "VP Sales",
        "Head of Growth",
        "CRO",
        "CMO",
        "VP Marketing",
        "Head of Sales",
        "Director of Sales",
        "Revenue Operations",
        "Head of RevOps",
        "Demand Generation Manager",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_count() -> usize {
    50
}
fn default_location() -> String {
    "France".into()
}
fn default_geo_id() -> String {
    "105015875".into()
}

/// `[store]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database path. Defaults to `~/.leadpipe/prospects.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// The configured path, or the default under the config directory.
    pub fn resolve_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join(DB_FILE_NAME)),
        }
    }
}

/// Which job-search backend the scrape stage uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobSearchProvider {
    /// Apify actor run (needs an API token).
    #[default]
    Apify,
    /// LinkedIn public guest search pages (no credentials).
    LinkedinGuest,
}

/// `[job_search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSearchConfig {
    #[serde(default)]
    pub provider: JobSearchProvider,

    #[serde(default = "default_apify_key_env")]
    pub api_key_env: String,

    /// Apify actor id (`user/actor`).
    #[serde(default = "default_actor")]
    pub actor: String,

    #[serde(default = "default_apify_base_url")]
    pub apify_base_url: String,

    #[serde(default = "default_linkedin_base_url")]
    pub linkedin_base_url: String,

    /// Postings older than this are dropped.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// Actor runs are synchronous and can take a while.
    #[serde(default = "default_job_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for JobSearchConfig {
    fn default() -> Self {
        Self {
            provider: JobSearchProvider::default(),
            api_key_env: default_apify_key_env(),
            actor: default_actor(),
            apify_base_url: default_apify_base_url(),
            linkedin_base_url: default_linkedin_base_url(),
            max_age_days: default_max_age_days(),
            timeout_secs: default_job_search_timeout(),
        }
    }
}

fn default_apify_key_env() -> String {
    "APIFY_API_KEY".into()
}
fn default_actor() -> String {
    "curious_coder/linkedin-jobs-search-scraper".into()
}
fn default_apify_base_url() -> String {
    "https://api.apify.com/v2".into()
}
fn default_linkedin_base_url() -> String {
    "https://www.linkedin.com".into()
}
fn default_max_age_days() -> u32 {
    7
}
fn default_job_search_timeout() -> u64 {
    300
}

/// `[contacts]` section (Hunter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactsConfig {
    #[serde(default = "default_hunter_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_hunter_base_url")]
    pub base_url: String,

    /// Seniority filter for decision-maker search.
    #[serde(default = "default_seniority")]
    pub seniority: String,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for ContactsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_hunter_key_env(),
            base_url: default_hunter_base_url(),
            seniority: default_seniority(),
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_hunter_key_env() -> String {
    "HUNTER_API_KEY".into()
}
fn default_hunter_base_url() -> String {
    "https://api.hunter.io/v2".into()
}
fn default_seniority() -> String {
    "senior".into()
}
fn default_http_timeout() -> u64 {
    30
}

/// How the personalization stage produces copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Ask the language model for a fresh sequence per prospect.
    #[default]
    Llm,
    /// Rotate through the built-in sequences.
    Templates,
}

/// `[llm]` section (Anthropic Messages API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_anthropic_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub copy_mode: CopyMode,

    /// Name signed at the bottom of template sequences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_key_env(),
            model: default_model(),
            base_url: default_anthropic_base_url(),
            max_tokens: default_max_tokens(),
            copy_mode: CopyMode::default(),
            sender_name: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_llm_timeout() -> u64 {
    60
}

/// `[campaign]` section (Smartlead).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    #[serde(default = "default_smartlead_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_campaign_id_env")]
    pub campaign_id_env: String,

    #[serde(default = "default_smartlead_base_url")]
    pub base_url: String,

    /// Skip leads already present in another campaign.
    #[serde(default = "default_true")]
    pub ignore_duplicates: bool,

    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_smartlead_key_env(),
            campaign_id_env: default_campaign_id_env(),
            base_url: default_smartlead_base_url(),
            ignore_duplicates: true,
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_smartlead_key_env() -> String {
    "SMARTLEAD_API_KEY".into()
}
fn default_campaign_id_env() -> String {
    "SMARTLEAD_CAMPAIGN_ID".into()
}
fn default_smartlead_base_url() -> String {
    "https://server.smartlead.ai/api/v1".into()
}
fn default_true() -> bool {
    true
}

/// `[filters]` section: which candidates never reach the store, and
/// which contacts count as verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// Candidates with at least this many employees are dropped.
    #[serde(default = "default_max_employees")]
    pub max_employees: u32,

    /// Classify companies with the LLM and drop consumer-facing ones.
    #[serde(default = "default_true")]
    pub classify_b2c: bool,

    /// Company names (matched as whole words, case-insensitive) that are always dropped.
    #[serde(default = "default_blocked_companies")]
    pub blocked_companies: Vec<String>,

    /// Minimum verifier score for catch-all (`accept_all`) addresses.
    #[serde(default = "default_min_accept_all_score")]
    pub min_accept_all_score: i64,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            max_employees: default_max_employees(),
            classify_b2c: true,
            blocked_companies: default_blocked_companies(),
            min_accept_all_score: default_min_accept_all_score(),
        }
    }
}

fn default_max_employees() -> u32 {
    500
}
fn default_min_accept_all_score() -> i64 {
    80
}
fn default_blocked_companies() -> Vec<String> {
    [
        "amazon",
        "apple",
        "google",
        "microsoft",
        "meta",
        "ibm",
        "oracle",
        "salesforce",
        "capgemini",
        "carrefour",
        "lvmh",
        "airbus",
        "thales",
        "bnp paribas",
        "société générale",
        "crédit agricole",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadpipe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadPipeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadpipe/leadpipe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadPipeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadPipeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| LeadPipeError::io(dir, e))?;
        }
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadPipeError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| LeadPipeError::io(path, e))?;
    tracing::info!(?path, "created default config file");
    Ok(())
}

/// Read a required credential from the environment variable `var_name`.
///
/// `service` only shapes the error message.
pub fn require_env(var_name: &str, service: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(LeadPipeError::config(format!(
            "{service} credential not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("HUNTER_API_KEY"));
        assert!(toml_str.contains("SMARTLEAD_CAMPAIGN_ID"));
        assert!(toml_str.contains("max_employees = 500"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.keywords.len(), 10);
        assert_eq!(parsed.job_search.provider, JobSearchProvider::Apify);
        assert_eq!(parsed.llm.copy_mode, CopyMode::Llm);
        assert_eq!(parsed.filters.min_accept_all_score, 80);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
keywords = ["Head of Sales"]
count = 5

[job_search]
provider = "linkedin-guest"

[llm]
copy_mode = "templates"

[store]
path = "/tmp/leadpipe-test.db"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.keywords, vec!["Head of Sales".to_string()]);
        assert_eq!(config.defaults.location, "France");
        assert_eq!(config.job_search.provider, JobSearchProvider::LinkedinGuest);
        assert_eq!(config.job_search.max_age_days, 7);
        assert_eq!(config.llm.copy_mode, CopyMode::Templates);
        assert_eq!(
            config.store.resolve_path().unwrap(),
            PathBuf::from("/tmp/leadpipe-test.db")
        );
    }

    #[test]
    fn init_config_at_writes_loadable_file() {
        let path = std::env::temp_dir()
            .join(format!("lp_cfg_{}", uuid::Uuid::now_v7()))
            .join("leadpipe.toml");
        init_config_at(&path).expect("write config");
        let loaded = load_config_from(&path).expect("load config");
        assert_eq!(loaded.defaults.count, 50);
    }

    #[test]
    fn missing_credential_is_config_error() {
        // Use a unique env var name to avoid interfering with other tests
        let result = require_env("LP_TEST_NONEXISTENT_KEY_12345", "Hunter");
        let err = result.unwrap_err();
        assert!(matches!(err, LeadPipeError::Config { .. }));
        assert!(err.to_string().contains("LP_TEST_NONEXISTENT_KEY_12345"));
    }
}
