//! End-to-end `ingest` pipeline: Scrape → Enrichment → Personalization.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use leadpipe_contacts::VerificationPolicy;
use leadpipe_copywriter::CopyGenerator;
use leadpipe_shared::{LeadPipeError, Result};
use leadpipe_storage::Storage;

use crate::enrich::{EnrichReport, run_enrichment};
use crate::filter::CandidateFilter;
use crate::personalize::{PersonalizeReport, run_personalization};
use crate::scrape::{ScrapeConfig, ScrapeReport, ScrapeServices, run_scrape};

/// A single record (or search) that failed during a stage. The stage carries on.
#[derive(Debug, Clone)]
pub struct RecordFailure {
    /// Company domain, company name, or search description.
    pub subject: String,
    pub message: String,
}

impl RecordFailure {
    pub fn new(subject: impl Into<String>, error: &LeadPipeError) -> Self {
        Self {
            subject: subject.into(),
            message: error.to_string(),
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each keyword or record in the current phase.
    fn item(&self, label: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item(&self, _label: &str, _current: usize, _total: usize) {}
}

/// Result of [`run_ingest`].
#[derive(Debug)]
pub struct IngestReport {
    pub scrape: ScrapeReport,
    pub enrichment: EnrichReport,
    pub personalization: PersonalizeReport,
    pub elapsed: Duration,
}

/// Run the three store-writing stages in order. Each stage picks up every
/// record in its input status, including leftovers from earlier runs.
#[instrument(skip_all, fields(keywords = ?config.keywords))]
pub async fn run_ingest(
    storage: &Storage,
    services: &ScrapeServices<'_>,
    generator: &dyn CopyGenerator,
    filter: &CandidateFilter,
    policy: VerificationPolicy,
    config: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let start = Instant::now();
    info!("starting ingest pipeline");

    let scrape = run_scrape(storage, services, filter, config, progress).await?;
    let enrichment = run_enrichment(storage, services.contacts, policy, progress).await?;
    let personalization = run_personalization(storage, generator, progress).await?;

    let elapsed = start.elapsed();
    info!(elapsed_ms = elapsed.as_millis() as u64, "ingest pipeline complete");
    Ok(IngestReport {
        scrape,
        enrichment,
        personalization,
        elapsed,
    })
}
