//! Scrape stage: job postings → resolved, filtered candidates → `unenriched` rows.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};

use leadpipe_contacts::ContactDiscovery;
use leadpipe_copywriter::{CompanyClassifier, CompanyInfo};
use leadpipe_jobsearch::{JobPosting, JobSource, SearchQuery};
use leadpipe_shared::{
    CompanyType, Prospect, ProspectCandidate, Result, employee_lower_bound,
};
use leadpipe_storage::{Storage, UpsertOutcome};

use crate::filter::{CandidateFilter, Rejection};
use crate::pipeline::{ProgressReporter, RecordFailure};

/// What to search for.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub keywords: Vec<String>,
    /// Maximum number of unique companies to consider.
    pub count: usize,
    pub location: String,
    pub geo_id: String,
}

/// Providers the scrape stage calls.
pub struct ScrapeServices<'a> {
    pub source: &'a dyn JobSource,
    pub contacts: &'a dyn ContactDiscovery,
    /// `None` disables B2B/B2C classification; unclassified companies count as B2B.
    pub classifier: Option<&'a dyn CompanyClassifier>,
}

#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Postings returned across all keywords.
    pub postings: usize,
    /// Companies left after name dedup and truncation.
    pub companies: usize,
    pub inserted: usize,
    /// Domain already in the store.
    pub duplicates: usize,
    /// No domain could be found for the company.
    pub unresolved: usize,
    pub rejected: Vec<(String, Rejection)>,
    pub failures: Vec<RecordFailure>,
}

/// Run every keyword search, resolve each unique company, filter, and insert
/// survivors as `unenriched`.
#[instrument(skip_all, fields(keywords = config.keywords.len(), count = config.count))]
pub async fn run_scrape(
    storage: &Storage,
    services: &ScrapeServices<'_>,
    filter: &CandidateFilter,
    config: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeReport> {
    let mut report = ScrapeReport::default();

    progress.phase("Searching job postings");
    let mut postings: Vec<(String, JobPosting)> = Vec::new();
    for (i, keyword) in config.keywords.iter().enumerate() {
        progress.item(keyword, i + 1, config.keywords.len());
        let query = SearchQuery {
            keyword: keyword.clone(),
            location: config.location.clone(),
            geo_id: config.geo_id.clone(),
            limit: config.count,
        };
        match services.source.search(&query).await {
            Ok(found) => {
                info!(%keyword, found = found.len(), source = services.source.name(), "search complete");
                postings.extend(found.into_iter().map(|p| (keyword.clone(), p)));
            }
            Err(e) => {
                warn!(%keyword, error = %e, "search failed");
                report.failures.push(RecordFailure::new(format!("search '{keyword}'"), &e));
            }
        }
    }
    report.postings = postings.len();

    let unique = dedup_by_company(postings, config.count);
    report.companies = unique.len();

    progress.phase("Resolving companies");
    let total = unique.len();
    for (i, (keyword, posting)) in unique.into_iter().enumerate() {
        progress.item(&posting.company_name, i + 1, total);
        let name = posting.company_name.clone();

        if let Some(rejection) = filter.blocked_name(&name) {
            debug!(company = %name, %rejection, "rejected before lookup");
            report.rejected.push((name, rejection));
            continue;
        }

        match process_posting(storage, services, filter, keyword, posting).await {
            Ok(Processed::Inserted) => report.inserted += 1,
            Ok(Processed::Duplicate) => report.duplicates += 1,
            Ok(Processed::Unresolved) => report.unresolved += 1,
            Ok(Processed::Rejected(rejection)) => report.rejected.push((name, rejection)),
            Err(e) => {
                warn!(company = %name, error = %e, "company resolution failed");
                report.failures.push(RecordFailure::new(name, &e));
            }
        }
    }

    info!(
        postings = report.postings,
        companies = report.companies,
        inserted = report.inserted,
        duplicates = report.duplicates,
        rejected = report.rejected.len(),
        "scrape complete"
    );
    Ok(report)
}

enum Processed {
    Inserted,
    Duplicate,
    Unresolved,
    Rejected(Rejection),
}

async fn process_posting(
    storage: &Storage,
    services: &ScrapeServices<'_>,
    filter: &CandidateFilter,
    keyword: String,
    posting: JobPosting,
) -> Result<Processed> {
    let domain = match posting.company_domain.clone() {
        Some(domain) => domain,
        None => match services.contacts.find_domain(&posting.company_name).await? {
            Some(domain) => domain,
            None => {
                debug!(company = %posting.company_name, "no domain found");
                return Ok(Processed::Unresolved);
            }
        },
    };

    // Known domains cost no further lookups.
    if storage.find_by_domain(&domain).await?.is_some() {
        return Ok(Processed::Duplicate);
    }

    let profile = match services.contacts.company_profile(&domain).await {
        Ok(profile) => profile.unwrap_or_default(),
        Err(e) => {
            warn!(%domain, error = %e, "company profile lookup failed, continuing without it");
            Default::default()
        }
    };

    let employee_range = posting.employee_range.clone().or(profile.employee_range);
    let mut candidate = ProspectCandidate {
        company_name: posting.company_name,
        company_domain: domain,
        company_type: CompanyType::B2b,
        employee_count: employee_range.as_deref().and_then(employee_lower_bound),
        employee_range,
        industry: profile.industry.clone(),
        job_title: Some(posting.job_title),
        job_url: posting.job_url,
        location: posting.location,
        source_keyword: Some(keyword),
        posted_date: posting.posted_date,
    };

    // Size is checked before spending a classification call.
    if let Some(rejection) = filter.check(&candidate) {
        return Ok(Processed::Rejected(rejection));
    }

    if let Some(classifier) = services.classifier {
        let info = CompanyInfo {
            name: candidate.company_name.clone(),
            industry: profile.industry,
            description: profile.description,
        };
        candidate.company_type = match classifier.classify(&info).await {
            Ok(company_type) => company_type,
            Err(e) => {
                warn!(domain = %candidate.company_domain, error = %e, "classification failed, assuming b2b");
                CompanyType::B2b
            }
        };
        if let Some(rejection) = filter.check(&candidate) {
            return Ok(Processed::Rejected(rejection));
        }
    }

    match storage.upsert(&Prospect::from_candidate(candidate)).await? {
        UpsertOutcome::Inserted => Ok(Processed::Inserted),
        UpsertOutcome::Skipped => Ok(Processed::Duplicate),
    }
}

/// Keep the first posting per company name (case-insensitive), up to `limit`.
fn dedup_by_company(
    postings: Vec<(String, JobPosting)>,
    limit: usize,
) -> Vec<(String, JobPosting)> {
    let mut seen = HashSet::new();
    postings
        .into_iter()
        .filter(|(_, p)| {
            let key = p.company_name.trim().to_lowercase();
            !key.is_empty() && seen.insert(key)
        })
        .take(limit)
        .collect()
}
