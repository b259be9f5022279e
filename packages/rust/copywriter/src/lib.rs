//! Outbound copy generation and company classification.
//!
//! - [`AnthropicClient`]: minimal Messages API client
//! - [`CopyGenerator`]: produces an [`EmailSequence`] for a prospect, either
//!   from the language model ([`LlmCopywriter`]) or from the built-in
//!   sequences ([`TemplateCopywriter`])
//! - [`CompanyClassifier`]: B2B/B2C classification ([`LlmClassifier`])

mod anthropic;
mod classifier;
mod sequence;
mod templates;

use async_trait::async_trait;
use leadpipe_shared::{CompanyType, EmailSequence, Prospect, Result};

pub use anthropic::AnthropicClient;
pub use classifier::LlmClassifier;
pub use sequence::{LlmCopywriter, parse_sequence};
pub use templates::TemplateCopywriter;

/// Produces an outbound email sequence for one prospect.
#[async_trait]
pub trait CopyGenerator: Send + Sync {
    async fn generate(&self, prospect: &Prospect) -> Result<EmailSequence>;
}

/// What is known about a company when classifying it.
#[derive(Debug, Clone, Default)]
pub struct CompanyInfo {
    pub name: String,
    pub industry: Option<String>,
    pub description: Option<String>,
}

impl CompanyInfo {
    /// True when there is nothing beyond the name to classify on.
    pub fn is_bare(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        blank(&self.industry) && blank(&self.description)
    }
}

/// Decides whether a company sells to businesses or consumers.
#[async_trait]
pub trait CompanyClassifier: Send + Sync {
    async fn classify(&self, company: &CompanyInfo) -> Result<CompanyType>;
}
