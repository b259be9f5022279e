//! Campaign export: hands ready prospects to an email-sending tool.

mod smartlead;

use async_trait::async_trait;
use leadpipe_shared::{Prospect, Result};

pub use smartlead::SmartleadClient;

/// What the campaign tool did with one lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Newly added to the campaign.
    Added,
    /// The campaign already held this lead.
    AlreadyInCampaign,
    /// Refused (invalid address, block list, …).
    Rejected(String),
}

/// An email campaign that accepts leads one at a time.
#[async_trait]
pub trait CampaignSink: Send + Sync {
    async fn push(&self, prospect: &Prospect) -> Result<PushOutcome>;
}
