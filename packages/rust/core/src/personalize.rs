//! Personalization stage: `enriched` → `ready`.

use tracing::{info, instrument, warn};

use leadpipe_copywriter::CopyGenerator;
use leadpipe_shared::{ProspectPatch, ProspectStatus, Result};
use leadpipe_storage::Storage;

use crate::pipeline::{ProgressReporter, RecordFailure};

#[derive(Debug, Default)]
pub struct PersonalizeReport {
    pub processed: usize,
    pub ready: usize,
    pub failures: Vec<RecordFailure>,
}

/// Generate and store an email sequence for every `enriched` prospect.
#[instrument(skip_all)]
pub async fn run_personalization(
    storage: &Storage,
    generator: &dyn CopyGenerator,
    progress: &dyn ProgressReporter,
) -> Result<PersonalizeReport> {
    let pending = storage.list(ProspectStatus::Enriched).await?;
    let mut report = PersonalizeReport::default();
    progress.phase("Writing email sequences");

    let total = pending.len();
    for (i, prospect) in pending.iter().enumerate() {
        progress.item(&prospect.company_domain, i + 1, total);
        report.processed += 1;

        let patch = generator
            .generate(prospect)
            .await
            .and_then(ProspectPatch::ready);
        match patch {
            Ok(patch) => {
                if storage.update(&prospect.id, &patch).await? == 1 {
                    report.ready += 1;
                }
            }
            Err(e) => {
                warn!(domain = %prospect.company_domain, error = %e, "sequence generation failed");
                storage
                    .update(&prospect.id, &ProspectPatch::failure(e.to_string()))
                    .await?;
                report
                    .failures
                    .push(RecordFailure::new(prospect.company_domain.clone(), &e));
            }
        }
    }

    info!(
        processed = report.processed,
        ready = report.ready,
        failed = report.failures.len(),
        "personalization complete"
    );
    Ok(report)
}
