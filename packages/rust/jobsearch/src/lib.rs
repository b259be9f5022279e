//! Job-search providers for the scrape stage.
//!
//! A [`JobSource`] turns one keyword search into a list of [`JobPosting`]s.
//! Two sources exist: [`ApifyJobSource`] runs a hosted LinkedIn scraper actor,
//! and [`LinkedInGuestSource`] reads LinkedIn's public guest result pages
//! directly.

mod age;
mod apify;
mod linkedin;

use async_trait::async_trait;
use leadpipe_shared::{LeadPipeError, Result};
use url::Url;

pub use age::parse_age_days;
pub use apify::ApifyJobSource;
pub use linkedin::LinkedInGuestSource;

/// User-Agent string for job-search requests.
const USER_AGENT: &str = concat!("LeadPipe/", env!("CARGO_PKG_VERSION"));

/// LinkedIn "time posted" filter: the past 7 days, in seconds.
const POSTED_WITHIN: &str = "r604800";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One keyword search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub keyword: String,
    pub location: String,
    /// LinkedIn geographic id (France is `105015875`).
    pub geo_id: String,
    /// Upper bound on postings to return for this keyword.
    pub limit: usize,
}

/// A job posting as returned by a source. Company fields beyond the name are
/// only present when the provider happens to carry them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPosting {
    pub job_title: String,
    pub company_name: String,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub posted_date: Option<String>,
    pub age_days: Option<u32>,
    pub company_domain: Option<String>,
    pub employee_range: Option<String>,
}

/// A provider of job postings.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Short provider name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Run one keyword search.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a LinkedIn job search URL (`{base}{path}?keywords=…&location=…`).
pub fn linkedin_search_url(base: &str, path: &str, query: &SearchQuery, start: usize) -> Result<Url> {
    let raw = format!("{}{path}", base.trim_end_matches('/'));
    let start = start.to_string();
    Url::parse_with_params(
        &raw,
        [
            ("keywords", query.keyword.as_str()),
            ("location", query.location.as_str()),
            ("geoId", query.geo_id.as_str()),
            ("f_TPR", POSTED_WITHIN),
            ("start", start.as_str()),
        ],
    )
    .map_err(|e| LeadPipeError::validation(format!("invalid search URL '{raw}': {e}")))
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LeadPipeError::Network(format!("failed to build HTTP client: {e}")))
}
