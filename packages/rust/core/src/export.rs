//! Export stage: `ready` → `sent`.

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use leadpipe_campaign::{CampaignSink, PushOutcome};
use leadpipe_shared::{LeadPipeError, Prospect, ProspectPatch, ProspectStatus, Result};
use leadpipe_storage::Storage;

use crate::pipeline::{ProgressReporter, RecordFailure};

#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Export at most this many prospects, oldest first.
    pub limit: Option<usize>,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub processed: usize,
    pub added: usize,
    /// The campaign already held the lead; still marked sent.
    pub already_in_campaign: usize,
    pub failures: Vec<RecordFailure>,
}

impl ExportReport {
    pub fn sent(&self) -> usize {
        self.added + self.already_in_campaign
    }
}

/// The `ready` prospects an export would push, oldest first.
///
/// This is the whole of a dry run: nothing is sent and nothing is written.
pub async fn ready_for_export(storage: &Storage, limit: Option<usize>) -> Result<Vec<Prospect>> {
    match limit {
        Some(limit) => storage.list_limited(ProspectStatus::Ready, limit).await,
        None => storage.list(ProspectStatus::Ready).await,
    }
}

/// Push every `ready` prospect to the campaign and mark accepted ones `sent`.
#[instrument(skip_all, fields(limit = ?options.limit))]
pub async fn run_export(
    storage: &Storage,
    sink: &dyn CampaignSink,
    options: ExportOptions,
    progress: &dyn ProgressReporter,
) -> Result<ExportReport> {
    let ready = ready_for_export(storage, options.limit).await?;
    let mut report = ExportReport::default();

    progress.phase("Exporting to campaign");
    let total = ready.len();
    for (i, prospect) in ready.iter().enumerate() {
        progress.item(&prospect.company_domain, i + 1, total);
        report.processed += 1;

        let outcome = sink.push(prospect).await.and_then(|outcome| match outcome {
            PushOutcome::Rejected(reason) => Err(LeadPipeError::validation(format!(
                "campaign rejected lead: {reason}"
            ))),
            accepted => Ok(accepted),
        });

        match outcome {
            Ok(accepted) => {
                let affected = storage
                    .update(&prospect.id, &ProspectPatch::sent(Utc::now()))
                    .await
                    .inspect_err(|e| {
                        error!(
                            domain = %prospect.company_domain,
                            error = %e,
                            "lead is in the campaign but could not be marked sent"
                        );
                    })?;
                if affected == 0 {
                    debug!(domain = %prospect.company_domain, "already marked sent");
                    continue;
                }
                if accepted == PushOutcome::AlreadyInCampaign {
                    report.already_in_campaign += 1;
                } else {
                    report.added += 1;
                }
            }
            Err(e) => {
                warn!(domain = %prospect.company_domain, error = %e, "export failed");
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
        sent = report.sent(),
        failed = report.failures.len(),
        "export complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{FakeSink, seed_ready, test_storage};

    #[tokio::test]
    async fn accepted_lead_is_marked_sent_once() {
        let storage = test_storage().await;
        let id = seed_ready(&storage, "acme.com").await;
        let sink = FakeSink::default();

        let report = run_export(&storage, &sink, ExportOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.added, 1);

        let row = storage.get(&id).await.unwrap().unwrap();
        assert_eq!(row.status, ProspectStatus::Sent);
        let sent_at = row.sent_at.expect("sent_at set");

        let again = run_export(&storage, &sink, ExportOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(again.processed, 0);
        assert_eq!(sink.pushed().len(), 1);
        assert_eq!(storage.get(&id).await.unwrap().unwrap().sent_at, Some(sent_at));
    }

    #[tokio::test]
    async fn duplicate_in_campaign_counts_as_sent() {
        let storage = test_storage().await;
        seed_ready(&storage, "acme.com").await;
        let sink = FakeSink::default().outcome("jane@acme.com", PushOutcome::AlreadyInCampaign);

        let report = run_export(&storage, &sink, ExportOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.already_in_campaign, 1);
        assert_eq!(report.sent(), 1);
    }

    #[tokio::test]
    async fn rejected_lead_stays_ready() {
        let storage = test_storage().await;
        let id = seed_ready(&storage, "acme.com").await;
        let sink = FakeSink::default()
            .outcome("jane@acme.com", PushOutcome::Rejected("invalid email address".into()));

        let report = run_export(&storage, &sink, ExportOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.sent(), 0);
        assert_eq!(report.failures.len(), 1);

        let row = storage.get(&id).await.unwrap().unwrap();
        assert_eq!(row.status, ProspectStatus::Ready);
        assert!(row.sent_at.is_none());
        assert!(row.last_error.unwrap().contains("invalid email"));
    }

    #[tokio::test]
    async fn failed_lead_does_not_stop_the_batch() {
        let storage = test_storage().await;
        let rejected = seed_ready(&storage, "bad.com").await;
        let errored = seed_ready(&storage, "down.com").await;
        let good = seed_ready(&storage, "good.com").await;
        let sink = FakeSink::default()
            .outcome("jane@bad.com", PushOutcome::Rejected("blocked domain".into()))
            .failing_for("jane@down.com");

        let report = run_export(&storage, &sink, ExportOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.sent(), 1);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(sink.pushed().len(), 3);

        for id in [&rejected, &errored] {
            let row = storage.get(id).await.unwrap().unwrap();
            assert_eq!(row.status, ProspectStatus::Ready);
            assert!(row.sent_at.is_none());
            assert!(row.last_error.is_some());
        }
        let row = storage.get(&good).await.unwrap().unwrap();
        assert_eq!(row.status, ProspectStatus::Sent);
        assert!(row.sent_at.is_some());
    }

    #[tokio::test]
    async fn store_failure_after_push_is_an_error() {
        let tmp = std::env::temp_dir().join(format!("lp_core_test_{}.db", uuid::Uuid::now_v7()));
        let writable = Storage::open(&tmp).await.unwrap();
        seed_ready(&writable, "acme.com").await;
        drop(writable);

        let storage = Storage::open_readonly(&tmp).await.unwrap();
        let sink = FakeSink::default();
        let result = run_export(&storage, &sink, ExportOptions::default(), &SilentProgress).await;

        assert!(result.is_err());
        assert_eq!(sink.pushed(), vec!["jane@acme.com".to_string()]);
        let row = &storage.list(ProspectStatus::Ready).await.unwrap()[0];
        assert!(row.sent_at.is_none());
    }

    #[tokio::test]
    async fn limit_caps_preview_and_export() {
        let storage = test_storage().await;
        seed_ready(&storage, "a.com").await;
        seed_ready(&storage, "b.com").await;
        seed_ready(&storage, "c.com").await;
        let sink = FakeSink::default();

        let preview = ready_for_export(&storage, Some(2)).await.unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(storage.list(ProspectStatus::Ready).await.unwrap().len(), 3);

        let report = run_export(
            &storage,
            &sink,
            ExportOptions { limit: Some(2) },
            &SilentProgress,
        )
        .await
        .unwrap();
        assert_eq!(report.sent(), 2);
        assert_eq!(storage.list(ProspectStatus::Ready).await.unwrap().len(), 1);
        let pushed = sink.pushed();
        let previewed: Vec<String> = preview.iter().filter_map(|p| p.email.clone()).collect();
        assert_eq!(pushed, previewed);
    }
}
