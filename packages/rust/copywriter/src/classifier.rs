//! B2B/B2C classification with the language model.

use async_trait::async_trait;
use leadpipe_shared::{CompanyType, Result};
use tracing::{debug, instrument};

use crate::{AnthropicClient, CompanyClassifier, CompanyInfo};

/// Descriptions are cut to this many characters before prompting.
const MAX_DESCRIPTION_CHARS: usize = 500;

/// A one-word answer is all that is needed.
const CLASSIFY_MAX_TOKENS: u32 = 10;

pub struct LlmClassifier {
    client: AnthropicClient,
}

impl LlmClassifier {
    pub fn new(client: AnthropicClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompanyClassifier for LlmClassifier {
    /// Companies with no industry or description are assumed B2B without a
    /// model call.
    #[instrument(skip_all, fields(company = %company.name))]
    async fn classify(&self, company: &CompanyInfo) -> Result<CompanyType> {
        if company.is_bare() {
            debug!("no firmographics, assuming b2b");
            return Ok(CompanyType::B2b);
        }

        let reply = self
            .client
            .complete(&build_prompt(company), Some(CLASSIFY_MAX_TOKENS))
            .await?;
        let company_type = interpret(&reply);
        debug!(reply = %reply.trim(), %company_type, "classified");
        Ok(company_type)
    }
}

fn build_prompt(company: &CompanyInfo) -> String {
    let mut context = format!("Company: {}", company.name);
    if let Some(industry) = company.industry.as_deref().filter(|s| !s.trim().is_empty()) {
        context.push_str(&format!("\nIndustry: {industry}"));
    }
    if let Some(description) = company.description.as_deref().filter(|s| !s.trim().is_empty()) {
        let cut: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        context.push_str(&format!("\nDescription: {cut}"));
    }

    format!(
        "Does this company sell mainly to businesses (B2B) or to consumers (B2C)?\n\n\
         {context}\n\n\
         B2B: software, consulting, enterprise tools, professional services.\n\
         B2C: retail, restaurants, consumer apps, e-commerce to individuals.\n\
         A company with significant business-facing operations counts as B2B.\n\n\
         Answer with one word: B2B or B2C"
    )
}

/// Anything other than an explicit `B2C` answer is B2B.
fn interpret(reply: &str) -> CompanyType {
    if reply.to_ascii_uppercase().contains("B2C") {
        CompanyType::B2c
    } else {
        CompanyType::B2b
    }
}
