//! Enrichment stage: `unenriched` → `enriched` (or `unenrichable`).

use tracing::{info, instrument, warn};

use leadpipe_contacts::{Contact, ContactDiscovery, Verification, VerificationPolicy};
use leadpipe_shared::{Prospect, ProspectPatch, ProspectStatus, Result};
use leadpipe_storage::Storage;

use crate::pipeline::{ProgressReporter, RecordFailure};

#[derive(Debug, Default)]
pub struct EnrichReport {
    pub processed: usize,
    pub enriched: usize,
    /// Contact found but failed verification; terminal.
    pub unenrichable: usize,
    /// No decision maker found; retried on the next run.
    pub not_found: usize,
    pub failures: Vec<RecordFailure>,
}

/// Find and verify a decision maker for every `unenriched` prospect.
#[instrument(skip_all)]
pub async fn run_enrichment(
    storage: &Storage,
    contacts: &dyn ContactDiscovery,
    policy: VerificationPolicy,
    progress: &dyn ProgressReporter,
) -> Result<EnrichReport> {
    let pending = storage.list(ProspectStatus::Unenriched).await?;
    let mut report = EnrichReport::default();
    progress.phase("Enriching contacts");

    let total = pending.len();
    for (i, prospect) in pending.iter().enumerate() {
        progress.item(&prospect.company_domain, i + 1, total);
        report.processed += 1;

        match enrich_one(contacts, prospect).await {
            Ok(Some((contact, verification))) => {
                let verified = policy.is_verified(&verification);
                let patch = contact_patch(contact, &verification, verified);
                storage.update(&prospect.id, &patch).await?;
                if verified {
                    report.enriched += 1;
                } else {
                    report.unenrichable += 1;
                }
            }
            Ok(None) => {
                report.not_found += 1;
                storage
                    .update(&prospect.id, &ProspectPatch::failure("no decision maker found"))
                    .await?;
            }
            Err(e) => {
                warn!(domain = %prospect.company_domain, error = %e, "enrichment failed");
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
        enriched = report.enriched,
        unenrichable = report.unenrichable,
        not_found = report.not_found,
        failed = report.failures.len(),
        "enrichment complete"
    );
    Ok(report)
}

async fn enrich_one(
    contacts: &dyn ContactDiscovery,
    prospect: &Prospect,
) -> Result<Option<(Contact, Verification)>> {
    let Some(contact) = contacts.find_decision_maker(&prospect.company_domain).await? else {
        return Ok(None);
    };
    let verification = contacts.verify_email(&contact.email).await?;
    Ok(Some((contact, verification)))
}

fn contact_patch(contact: Contact, verification: &Verification, verified: bool) -> ProspectPatch {
    let (status, last_error) = if verified {
        (ProspectStatus::Enriched, None)
    } else {
        (
            ProspectStatus::Unenrichable,
            Some(format!(
                "{} did not pass verification: {} (score {})",
                contact.email, verification.status, verification.score
            )),
        )
    };

    ProspectPatch {
        email: Some(contact.email),
        first_name: contact.first_name,
        last_name: contact.last_name,
        title: contact.position,
        verification_status: Some(verification.status.clone()),
        verification_score: Some(verification.score),
        status: Some(status),
        last_error: Some(last_error),
        ..ProspectPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{FakeContacts, seed, test_storage};

    #[tokio::test]
    async fn verified_contact_enriches() {
        let storage = test_storage().await;
        let id = seed(&storage, "acme.com").await;
        let contacts = FakeContacts::default()
            .contact("acme.com", "jane@acme.com", "Jane", "Doe", "CEO")
            .verification("jane@acme.com", "valid", 97);

        let report = run_enrichment(&storage, &contacts, VerificationPolicy::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.enriched, 1);

        let row = storage.get(&id).await.unwrap().unwrap();
        assert_eq!(row.status, ProspectStatus::Enriched);
        assert_eq!(row.email.as_deref(), Some("jane@acme.com"));
        assert_eq!(row.first_name.as_deref(), Some("Jane"));
        assert_eq!(row.title.as_deref(), Some("CEO"));
        assert_eq!(row.verification_status.as_deref(), Some("valid"));
        assert_eq!(row.verification_score, Some(97));
        assert!(row.last_error.is_none());
    }

    #[tokio::test]
    async fn low_score_catch_all_is_unenrichable() {
        let storage = test_storage().await;
        let id = seed(&storage, "acme.com").await;
        let contacts = FakeContacts::default()
            .contact("acme.com", "jane@acme.com", "Jane", "Doe", "CEO")
            .verification("jane@acme.com", "accept_all", 60);

        let report = run_enrichment(&storage, &contacts, VerificationPolicy::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.unenrichable, 1);

        let row = storage.get(&id).await.unwrap().unwrap();
        assert_eq!(row.status, ProspectStatus::Unenrichable);
        assert!(row.last_error.unwrap().contains("accept_all"));

        // Terminal: a later run does not revisit it.
        let again = run_enrichment(&storage, &contacts, VerificationPolicy::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(again.processed, 0);
    }

    #[tokio::test]
    async fn missing_contact_stays_unenriched() {
        let storage = test_storage().await;
        let id = seed(&storage, "nobody.io").await;
        let contacts = FakeContacts::default();

        let report = run_enrichment(&storage, &contacts, VerificationPolicy::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.not_found, 1);

        let row = storage.get(&id).await.unwrap().unwrap();
        assert_eq!(row.status, ProspectStatus::Unenriched);
        assert_eq!(row.last_error.as_deref(), Some("no decision maker found"));
    }

    #[tokio::test]
    async fn provider_error_is_isolated_per_record() {
        let storage = test_storage().await;
        let broken = seed(&storage, "broken.io").await;
        let ok = seed(&storage, "acme.com").await;
        let contacts = FakeContacts::default()
            .failing_domain("broken.io")
            .contact("acme.com", "jane@acme.com", "Jane", "Doe", "CEO")
            .verification("jane@acme.com", "valid", 90);

        let report = run_enrichment(&storage, &contacts, VerificationPolicy::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject, "broken.io");
        assert_eq!(report.enriched, 1);

        let row = storage.get(&broken).await.unwrap().unwrap();
        assert_eq!(row.status, ProspectStatus::Unenriched);
        assert!(row.last_error.is_some());
        assert_eq!(
            storage.get(&ok).await.unwrap().unwrap().status,
            ProspectStatus::Enriched
        );
    }
}
