//! Hunter.io API client.

use async_trait::async_trait;
use leadpipe_shared::{ContactsConfig, LeadPipeError, Result, normalize_domain};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{CompanyProfile, Contact, ContactDiscovery, Verification};

const SERVICE: &str = "hunter";
const USER_AGENT: &str = concat!("LeadPipe/", env!("CARGO_PKG_VERSION"));

pub struct HunterClient {
    client: Client,
    base_url: String,
    api_key: String,
    seniority: String,
}

impl HunterClient {
    pub fn new(config: &ContactsConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeadPipeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            seniority: config.seniority.clone(),
        })
    }

    /// GET `{base}/{endpoint}` and decode the `data` envelope. A 404 means the
    /// provider has no record and yields `None`.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| LeadPipeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadPipeError::provider(
                SERVICE,
                format!("{endpoint}: HTTP {status}: {}", body.trim()),
            ));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| LeadPipeError::parse(format!("{SERVICE} {endpoint}: {e}")))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ContactDiscovery for HunterClient {
    #[instrument(skip(self))]
    async fn find_domain(&self, company_name: &str) -> Result<Option<String>> {
        let data: Option<DomainSearch> = self
            .get("domain-search", &[("company", company_name), ("limit", "1")])
            .await?;
        let domain = data.and_then(|d| d.domain).as_deref().and_then(normalize_domain);
        debug!(?domain, "domain lookup");
        Ok(domain)
    }

    #[instrument(skip(self))]
    async fn company_profile(&self, domain: &str) -> Result<Option<CompanyProfile>> {
        let data: Option<Company> = self.get("companies/find", &[("domain", domain)]).await?;
        Ok(data.map(|c| CompanyProfile {
            employee_range: c.metrics.and_then(|m| m.employees),
            industry: c
                .category
                .and_then(|cat| cat.industry.or(cat.sector))
                .or(c.industry),
            description: c.description,
        }))
    }

    #[instrument(skip(self))]
    async fn find_decision_maker(&self, domain: &str) -> Result<Option<Contact>> {
        let data: Option<DomainSearch> = self
            .get(
                "domain-search",
                &[
                    ("domain", domain),
                    ("limit", "1"),
                    ("seniority", self.seniority.as_str()),
                    ("type", "personal"),
                ],
            )
            .await?;

        let contact = data
            .and_then(|d| d.emails.into_iter().next())
            .filter(|e| !e.value.trim().is_empty())
            .map(|e| Contact {
                email: e.value,
                first_name: e.first_name,
                last_name: e.last_name,
                position: e.position,
            });
        debug!(found = contact.is_some(), "decision maker lookup");
        Ok(contact)
    }

    #[instrument(skip(self))]
    async fn verify_email(&self, email: &str) -> Result<Verification> {
        let data: Option<Verifier> = self.get("email-verifier", &[("email", email)]).await?;
        let data = data.ok_or_else(|| {
            LeadPipeError::provider(SERVICE, format!("no verification result for {email}"))
        })?;
        Ok(Verification {
            status: data.status.unwrap_or_else(|| "unknown".into()),
            score: data.score.unwrap_or(0),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct DomainSearch {
    domain: Option<String>,
    #[serde(default)]
    emails: Vec<EmailEntry>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    value: String,
    first_name: Option<String>,
    last_name: Option<String>,
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Company {
    metrics: Option<Metrics>,
    category: Option<Category>,
    industry: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Metrics {
    employees: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    industry: Option<String>,
    sector: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verifier {
    status: Option<String>,
    score: Option<i64>,
}
