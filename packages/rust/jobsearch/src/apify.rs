//! Apify actor-backed job search.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use leadpipe_shared::{JobSearchConfig, LeadPipeError, Result, normalize_domain};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{JobPosting, JobSource, SearchQuery, build_client, linkedin_search_url};

const SERVICE: &str = "apify";

/// Runs a LinkedIn jobs actor synchronously and reads its dataset items.
pub struct ApifyJobSource {
    client: Client,
    base_url: String,
    actor: String,
    token: String,
    linkedin_base_url: String,
    max_age_days: u32,
}

impl ApifyJobSource {
    pub fn new(config: &JobSearchConfig, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.apify_base_url.trim_end_matches('/').to_string(),
            actor: config.actor.clone(),
            token: token.into(),
            linkedin_base_url: config.linkedin_base_url.clone(),
            max_age_days: config.max_age_days,
        })
    }

    /// Actor ids are written `user/actor` but addressed as `user~actor`.
    fn run_url(&self) -> String {
        format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url,
            self.actor.replace('/', "~")
        )
    }
}

#[async_trait]
impl JobSource for ApifyJobSource {
    fn name(&self) -> &'static str {
        SERVICE
    }

    #[instrument(skip_all, fields(keyword = %query.keyword))]
    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>> {
        let search_url = linkedin_search_url(&self.linkedin_base_url, "/jobs/search/", query, 0)?;
        let body = serde_json::json!({
            "urls": [search_url.as_str()],
            "count": query.limit,
            "scrapeCompany": true,
        });

        let url = self.run_url();
        let response = self
            .client
            .post(&url)
            .query(&[("token", self.token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadPipeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadPipeError::provider(
                SERVICE,
                format!("HTTP {status}: {}", text.trim()),
            ));
        }

        let items: Vec<ApifyItem> = response
            .json()
            .await
            .map_err(|e| LeadPipeError::parse(format!("apify dataset items: {e}")))?;
        let total = items.len();

        let today = Utc::now().date_naive();
        let postings: Vec<JobPosting> = items
            .into_iter()
            .filter_map(|item| item.into_posting(today))
            .filter(|p| p.age_days.is_none_or(|age| age <= self.max_age_days))
            .take(query.limit)
            .collect();

        debug!(total, kept = postings.len(), "apify items mapped");
        Ok(postings)
    }
}

// ---------------------------------------------------------------------------
// Dataset item
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApifyItem {
    #[serde(alias = "job_title")]
    title: Option<String>,
    #[serde(rename = "companyName", alias = "company_name")]
    company_name: Option<String>,
    location: Option<String>,
    #[serde(alias = "jobUrl", alias = "job_url")]
    link: Option<String>,
    #[serde(rename = "postedAt", alias = "posted_date")]
    posted_at: Option<String>,
    posted_age_days: Option<u32>,
    #[serde(rename = "companyWebsite", alias = "company_website")]
    company_website: Option<String>,
    #[serde(rename = "companyEmployeesCount", alias = "employee_range")]
    employees: Option<serde_json::Value>,
}

impl ApifyItem {
    fn into_posting(self, today: NaiveDate) -> Option<JobPosting> {
        let job_title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())?;
        let company_name = self
            .company_name
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())?;

        let age_days = self.posted_age_days.or_else(|| {
            let date = self.posted_at.as_deref()?.get(..10)?;
            let posted = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            u32::try_from((today - posted).num_days().max(0)).ok()
        });

        let employee_range = match self.employees {
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        };

        Some(JobPosting {
            job_title,
            company_name,
            location: self.location,
            job_url: self.link,
            posted_date: self.posted_at,
            age_days,
            company_domain: self.company_website.as_deref().and_then(normalize_domain),
            employee_range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> JobSearchConfig {
        JobSearchConfig {
            apify_base_url: base.to_string(),
            ..JobSearchConfig::default()
        }
    }

    fn query() -> SearchQuery {
        SearchQuery {
            keyword: "VP Sales".into(),
            location: "France".into(),
            geo_id: "105015875".into(),
            limit: 10,
        }
    }

    #[test]
    fn actor_id_is_addressed_with_tilde() {
        let source = ApifyJobSource::new(&config("https://api.apify.com/v2/"), "t").unwrap();
        assert_eq!(
            source.run_url(),
            "https://api.apify.com/v2/acts/curious_coder~linkedin-jobs-search-scraper/run-sync-get-dataset-items"
        );
    }

    #[tokio::test]
    async fn maps_items_and_drops_incomplete_or_stale() {
        let server = wiremock::MockServer::start().await;
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

        let items = serde_json::json!([
            {
                "title": "VP Sales",
                "companyName": "Acme",
                "location": "Paris",
                "link": "https://www.linkedin.com/jobs/view/1",
                "postedAt": today,
                "companyWebsite": "https://www.acme.com/",
                "companyEmployeesCount": 50
            },
            { "title": "Head of Growth", "companyName": "" },
            {
                "title": "Sales Director",
                "companyName": "Oldco",
                "posted_age_days": 21
            },
            {
                "job_title": "CRO",
                "company_name": "Betaco",
                "posted_age_days": 2,
                "employee_range": "11-50"
            }
        ]);

        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path(
                "/acts/curious_coder~linkedin-jobs-search-scraper/run-sync-get-dataset-items",
            ))
            .and(wiremock::matchers::query_param("token", "secret"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(items))
            .mount(&server)
            .await;

        let source = ApifyJobSource::new(&config(&server.uri()), "secret").unwrap();
        let postings = source.search(&query()).await.unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].company_name, "Acme");
        assert_eq!(postings[0].company_domain.as_deref(), Some("acme.com"));
        assert_eq!(postings[0].employee_range.as_deref(), Some("50"));
        assert_eq!(postings[0].age_days, Some(0));
        assert_eq!(postings[1].company_name, "Betaco");
        assert_eq!(postings[1].employee_range.as_deref(), Some("11-50"));
    }

    #[tokio::test]
    async fn http_error_is_provider_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let source = ApifyJobSource::new(&config(&server.uri()), "wrong").unwrap();
        let err = source.search(&query()).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("apify"), "{msg}");
        assert!(msg.contains("401"), "{msg}");
    }
}
