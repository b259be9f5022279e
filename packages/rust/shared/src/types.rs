//! Core domain types for the prospect pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeadPipeError, Result};

// ---------------------------------------------------------------------------
// ProspectId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for prospect identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProspectId(pub Uuid);

impl ProspectId {
    /// Generate a new time-sortable prospect identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ProspectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProspectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProspectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ProspectStatus
// ---------------------------------------------------------------------------

/// Which pipeline stage a prospect has most recently completed.
///
/// The main path is `unenriched → enriched → ready → sent`. `unenrichable`
/// is a side exit for prospects whose contact failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProspectStatus {
    Unenriched,
    Enriched,
    Ready,
    Sent,
    Unenrichable,
}

impl ProspectStatus {
    /// Every status, in pipeline order.
    pub const ALL: [ProspectStatus; 5] = [
        Self::Unenriched,
        Self::Enriched,
        Self::Ready,
        Self::Sent,
        Self::Unenrichable,
    ];

    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unenriched => "unenriched",
            Self::Enriched => "enriched",
            Self::Ready => "ready",
            Self::Sent => "sent",
            Self::Unenrichable => "unenrichable",
        }
    }

    /// Statuses a record must currently hold to move into `self`.
    pub fn predecessors(&self) -> &'static [ProspectStatus] {
        match self {
            Self::Unenriched => &[],
            Self::Enriched | Self::Unenrichable => &[Self::Unenriched],
            Self::Ready => &[Self::Enriched],
            Self::Sent => &[Self::Ready],
        }
    }
}

impl std::fmt::Display for ProspectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProspectStatus {
    type Err = LeadPipeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LeadPipeError::validation(format!("unknown prospect status '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// CompanyType
// ---------------------------------------------------------------------------

/// Who a company primarily sells to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyType {
    #[default]
    B2b,
    B2c,
}

impl CompanyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B2b => "b2b",
            Self::B2c => "b2c",
        }
    }
}

impl std::fmt::Display for CompanyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanyType {
    type Err = LeadPipeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "b2b" => Ok(Self::B2b),
            "b2c" => Ok(Self::B2c),
            other => Err(LeadPipeError::validation(format!(
                "unknown company type '{other}'"
            ))),
        }
    }
}

/// Lower bound of an employee-count range such as `"51-200"`, `"501-1K"`,
/// `"10K-50K"`, `"10001+"` or a bare `"50"`.
pub fn employee_lower_bound(range: &str) -> Option<u32> {
    let first = range
        .trim()
        .split(['-', '+', '–'])
        .next()?
        .trim()
        .replace(',', "");
    if first.is_empty() {
        return None;
    }

    let (digits, multiplier) = match first.strip_suffix(['K', 'k']) {
        Some(d) => (d, 1_000),
        None => (first.as_str(), 1),
    };
    digits.parse::<u32>().ok().map(|n| n.saturating_mul(multiplier))
}

/// Reduce a website or URL to a bare lowercase host (`"https://www.Acme.com/about"`
/// becomes `"acme.com"`). Returns `None` when nothing host-like remains.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let trimmed = raw.trim().to_ascii_lowercase();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(&trimmed);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = host.split(':').next().unwrap_or_default();

    if host.contains('.') && !host.contains(' ') && !host.starts_with('.') {
        Some(host.to_string())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// ProspectCandidate
// ---------------------------------------------------------------------------

/// A scraped posting after company resolution, before it reaches the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProspectCandidate {
    pub company_name: String,
    pub company_domain: String,
    pub company_type: CompanyType,
    pub employee_count: Option<u32>,
    pub employee_range: Option<String>,
    pub industry: Option<String>,
    pub job_title: Option<String>,
    pub job_url: Option<String>,
    pub location: Option<String>,
    pub source_keyword: Option<String>,
    pub posted_date: Option<String>,
}

// ---------------------------------------------------------------------------
// EmailSequence
// ---------------------------------------------------------------------------

/// A three-email outbound sequence with a shared subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSequence {
    pub subject_line: String,
    pub email_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_1_ps: Option<String>,
    pub email_2: String,
    pub email_3: String,
}

impl EmailSequence {
    /// Reject a sequence with any blank required field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("subject_line", &self.subject_line),
            ("email_1", &self.email_1),
            ("email_2", &self.email_2),
            ("email_3", &self.email_3),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(LeadPipeError::validation(format!(
                    "generated sequence has an empty {name}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Prospect
// ---------------------------------------------------------------------------

/// One company + contact candidate tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub id: ProspectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Scrape origin
    pub company_name: String,
    pub job_title: Option<String>,
    pub job_url: Option<String>,
    pub location: Option<String>,
    pub source_keyword: Option<String>,
    pub posted_date: Option<String>,

    // Company and contact
    pub company_domain: String,
    pub company_type: CompanyType,
    pub employee_range: Option<String>,
    pub industry: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub verification_status: Option<String>,
    pub verification_score: Option<i64>,

    // Generated copy
    pub subject_line: Option<String>,
    pub email_1: Option<String>,
    pub email_1_ps: Option<String>,
    pub email_2: Option<String>,
    pub email_3: Option<String>,

    // Lifecycle
    pub status: ProspectStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Prospect {
    /// Build a fresh `unenriched` prospect from a resolved candidate.
    pub fn from_candidate(candidate: ProspectCandidate) -> Self {
        let now = Utc::now();
        Self {
            id: ProspectId::new(),
            created_at: now,
            updated_at: now,
            company_name: candidate.company_name,
            job_title: candidate.job_title,
            job_url: candidate.job_url,
            location: candidate.location,
            source_keyword: candidate.source_keyword,
            posted_date: candidate.posted_date,
            company_domain: candidate.company_domain,
            company_type: candidate.company_type,
            employee_range: candidate.employee_range,
            industry: candidate.industry,
            email: None,
            first_name: None,
            last_name: None,
            title: None,
            verification_status: None,
            verification_score: None,
            subject_line: None,
            email_1: None,
            email_1_ps: None,
            email_2: None,
            email_3: None,
            status: ProspectStatus::Unenriched,
            sent_at: None,
            last_error: None,
        }
    }

    /// The stored email sequence, if every required field is present.
    pub fn sequence(&self) -> Option<EmailSequence> {
        let seq = EmailSequence {
            subject_line: self.subject_line.clone()?,
            email_1: self.email_1.clone()?,
            email_1_ps: self.email_1_ps.clone().filter(|ps| !ps.trim().is_empty()),
            email_2: self.email_2.clone()?,
            email_3: self.email_3.clone()?,
        };
        seq.validate().ok().map(|_| seq)
    }

    /// `"First Last"` when either name is known.
    pub fn contact_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!full.is_empty()).then_some(full)
    }
}

// ---------------------------------------------------------------------------
// ProspectPatch
// ---------------------------------------------------------------------------

/// A partial update to one prospect row. `None` fields are left untouched.
///
/// `last_error` is doubly optional: `Some(None)` clears the column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProspectPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub verification_status: Option<String>,
    pub verification_score: Option<i64>,
    pub subject_line: Option<String>,
    pub email_1: Option<String>,
    pub email_1_ps: Option<String>,
    pub email_2: Option<String>,
    pub email_3: Option<String>,
    pub status: Option<ProspectStatus>,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<Option<String>>,
}

impl ProspectPatch {
    /// Patch that only records a per-record failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            last_error: Some(Some(message.into())),
            ..Self::default()
        }
    }

    /// Patch that stores a validated sequence and moves the record to `ready`.
    pub fn ready(sequence: EmailSequence) -> Result<Self> {
        sequence.validate()?;
        Ok(Self {
            subject_line: Some(sequence.subject_line),
            email_1: Some(sequence.email_1),
            email_1_ps: Some(sequence.email_1_ps.unwrap_or_default()),
            email_2: Some(sequence.email_2),
            email_3: Some(sequence.email_3),
            status: Some(ProspectStatus::Ready),
            last_error: Some(None),
            ..Self::default()
        })
    }

    /// Patch that marks a prospect as exported at `at`.
    pub fn sent(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ProspectStatus::Sent),
            sent_at: Some(at),
            last_error: Some(None),
            ..Self::default()
        }
    }

    /// True when applying this patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
