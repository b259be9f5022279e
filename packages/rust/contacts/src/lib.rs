//! Contact discovery: company domains, firmographics, decision makers and
//! email verification.

mod hunter;

use async_trait::async_trait;
use leadpipe_shared::{FiltersConfig, Result};

pub use hunter::HunterClient;

/// Firmographic data for a company domain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    /// Provider range text such as `"51-200"`.
    pub employee_range: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
}

/// A named person with an email address at a company.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
}

/// Result of verifying a single address.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    /// Provider status (`valid`, `accept_all`, `invalid`, `unknown`, …).
    pub status: String,
    pub score: i64,
}

/// Decides which verification results are good enough to send to.
#[derive(Debug, Clone, Copy)]
pub struct VerificationPolicy {
    pub min_accept_all_score: i64,
}

impl VerificationPolicy {
    pub fn from_config(filters: &FiltersConfig) -> Self {
        Self {
            min_accept_all_score: filters.min_accept_all_score,
        }
    }

    /// `valid`, or a catch-all domain (`accept_all`) scoring at least the threshold.
    pub fn is_verified(&self, verification: &Verification) -> bool {
        match verification.status.as_str() {
            "valid" => true,
            "accept_all" => verification.score >= self.min_accept_all_score,
            _ => false,
        }
    }
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self::from_config(&FiltersConfig::default())
    }
}

/// A contact-discovery provider.
#[async_trait]
pub trait ContactDiscovery: Send + Sync {
    /// Resolve a company name to its web domain.
    async fn find_domain(&self, company_name: &str) -> Result<Option<String>>;

    /// Firmographics for a domain, if the provider knows the company.
    async fn company_profile(&self, domain: &str) -> Result<Option<CompanyProfile>>;

    /// The most relevant senior person with a personal address at `domain`.
    async fn find_decision_maker(&self, domain: &str) -> Result<Option<Contact>>;

    /// Check deliverability of one address.
    async fn verify_email(&self, email: &str) -> Result<Verification>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(status: &str, score: i64) -> Verification {
        Verification {
            status: status.into(),
            score,
        }
    }

    #[test]
    fn policy_accepts_valid_and_confident_catch_all() {
        let policy = VerificationPolicy::default();
        assert!(policy.is_verified(&v("valid", 0)));
        assert!(policy.is_verified(&v("accept_all", 80)));
        assert!(!policy.is_verified(&v("accept_all", 79)));
        assert!(!policy.is_verified(&v("invalid", 99)));
        assert!(!policy.is_verified(&v("unknown", 100)));
    }

    #[test]
    fn policy_threshold_is_tunable() {
        let policy = VerificationPolicy {
            min_accept_all_score: 50,
        };
        assert!(policy.is_verified(&v("accept_all", 60)));
    }
}
