//! Smartlead campaign API client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use leadpipe_shared::{CampaignConfig, LeadPipeError, Prospect, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{CampaignSink, PushOutcome};

const SERVICE: &str = "smartlead";
const USER_AGENT: &str = concat!("LeadPipe/", env!("CARGO_PKG_VERSION"));

pub struct SmartleadClient {
    client: Client,
    base_url: String,
    api_key: String,
    campaign_id: String,
    ignore_duplicates: bool,
}

impl SmartleadClient {
    pub fn new(
        config: &CampaignConfig,
        api_key: impl Into<String>,
        campaign_id: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeadPipeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            campaign_id: campaign_id.into(),
            ignore_duplicates: config.ignore_duplicates,
        })
    }
}

#[async_trait]
impl CampaignSink for SmartleadClient {
    #[instrument(skip_all, fields(domain = %prospect.company_domain, campaign = %self.campaign_id))]
    async fn push(&self, prospect: &Prospect) -> Result<PushOutcome> {
        let lead = Lead::from_prospect(prospect)?;
        let payload = AddLeads {
            lead_list: [lead],
            settings: AddLeadsSettings {
                ignore_global_block_list: false,
                ignore_unsubscribe_list: false,
                ignore_duplicate_leads_in_other_campaign: self.ignore_duplicates,
            },
        };

        let url = format!("{}/campaigns/{}/leads", self.base_url, self.campaign_id);
        let response = self
            .client
            .post(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| LeadPipeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadPipeError::provider(
                SERVICE,
                format!("HTTP {status}: {}", body.trim()),
            ));
        }

        let result: AddLeadsResult = response
            .json()
            .await
            .map_err(|e| LeadPipeError::parse(format!("{SERVICE} response: {e}")))?;
        let outcome = result.outcome();
        debug!(?outcome, "lead pushed");
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct AddLeads {
    lead_list: [Lead; 1],
    settings: AddLeadsSettings,
}

#[derive(Debug, Serialize)]
struct AddLeadsSettings {
    ignore_global_block_list: bool,
    ignore_unsubscribe_list: bool,
    ignore_duplicate_leads_in_other_campaign: bool,
}

/// One lead with its generated copy attached as custom fields, which the
/// campaign's email steps reference as `{{subject_line}}`, `{{email_1}}`, ….
#[derive(Debug, Serialize)]
struct Lead {
    email: String,
    first_name: String,
    last_name: String,
    company_name: String,
    website: String,
    custom_fields: BTreeMap<&'static str, String>,
}

impl Lead {
    fn from_prospect(prospect: &Prospect) -> Result<Self> {
        let email = prospect
            .email
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                LeadPipeError::validation(format!(
                    "{} has no contact email",
                    prospect.company_domain
                ))
            })?;

        let copy = [
            ("subject_line", &prospect.subject_line),
            ("email_1", &prospect.email_1),
            ("email_1_ps", &prospect.email_1_ps),
            ("email_2", &prospect.email_2),
            ("email_3", &prospect.email_3),
        ];
        let custom_fields = copy
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_deref()
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (key, v.to_string()))
            })
            .collect();

        Ok(Self {
            email,
            first_name: prospect.first_name.clone().unwrap_or_default(),
            last_name: prospect.last_name.clone().unwrap_or_default(),
            company_name: prospect.company_name.clone(),
            website: prospect.company_domain.clone(),
            custom_fields,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddLeadsResult {
    upload_count: Option<u64>,
    total_leads: u64,
    already_added_to_campaign: u64,
    duplicate_count: u64,
    invalid_email_count: u64,
    block_count: u64,
}

impl AddLeadsResult {
    fn outcome(&self) -> PushOutcome {
        if self.invalid_email_count > 0 {
            return PushOutcome::Rejected("invalid email address".into());
        }
        if self.already_added_to_campaign > 0 || self.duplicate_count > 0 {
            return PushOutcome::AlreadyInCampaign;
        }
        if self.upload_count.unwrap_or(self.total_leads) > 0 {
            return PushOutcome::Added;
        }
        if self.block_count > 0 {
            return PushOutcome::Rejected("lead is on the block list".into());
        }
        PushOutcome::Rejected("lead was not accepted".into())
    }
}
