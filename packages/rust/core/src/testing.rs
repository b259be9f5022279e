//! In-memory provider fakes and store seeding for stage tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use leadpipe_campaign::{CampaignSink, PushOutcome};
use leadpipe_contacts::{CompanyProfile, Contact, ContactDiscovery, Verification};
use leadpipe_copywriter::{CompanyClassifier, CompanyInfo, CopyGenerator};
use leadpipe_jobsearch::{JobPosting, JobSource, SearchQuery};
use leadpipe_shared::{
    CompanyType, EmailSequence, LeadPipeError, Prospect, ProspectCandidate, ProspectId,
    ProspectPatch, ProspectStatus, Result,
};
use leadpipe_storage::Storage;

pub async fn test_storage() -> Storage {
    let tmp = std::env::temp_dir().join(format!("lp_core_test_{}.db", Uuid::now_v7()));
    Storage::open(&tmp).await.expect("open test db")
}

pub fn posting(title: &str, company: &str) -> JobPosting {
    JobPosting {
        job_title: title.into(),
        company_name: company.into(),
        location: Some("Paris".into()),
        job_url: Some(format!("https://www.linkedin.com/jobs/view/{}", company.to_lowercase())),
        posted_date: Some("2026-10-17".into()),
        age_days: Some(2),
        ..JobPosting::default()
    }
}

/// Insert an `unenriched` prospect for `domain`.
pub async fn seed(storage: &Storage, domain: &str) -> ProspectId {
    let name = domain.split('.').next().unwrap_or(domain);
    let mut company_name = name.to_string();
    if let Some(first) = company_name.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    let prospect = Prospect::from_candidate(ProspectCandidate {
        company_name,
        company_domain: domain.into(),
        company_type: CompanyType::B2b,
        employee_count: Some(40),
        employee_range: Some("11-50".into()),
        industry: Some("Software".into()),
        job_title: Some("VP Sales".into()),
        job_url: None,
        location: Some("Paris".into()),
        source_keyword: Some("VP Sales".into()),
        posted_date: None,
    });
    let id = prospect.id.clone();
    storage.upsert(&prospect).await.expect("seed upsert");
    id
}

/// Insert a prospect and move it to `enriched` with contact `jane@{domain}`.
pub async fn seed_enriched(storage: &Storage, domain: &str) -> ProspectId {
    let id = seed(storage, domain).await;
    let patch = ProspectPatch {
        email: Some(format!("jane@{domain}")),
        first_name: Some("Jane".into()),
        last_name: Some("Doe".into()),
        title: Some("CEO".into()),
        verification_status: Some("valid".into()),
        verification_score: Some(95),
        status: Some(ProspectStatus::Enriched),
        ..ProspectPatch::default()
    };
    assert_eq!(storage.update(&id, &patch).await.expect("enrich"), 1);
    id
}

/// Insert a prospect and move it all the way to `ready`.
pub async fn seed_ready(storage: &Storage, domain: &str) -> ProspectId {
    let id = seed_enriched(storage, domain).await;
    let patch = ProspectPatch::ready(sequence_for("Company")).expect("valid sequence");
    assert_eq!(storage.update(&id, &patch).await.expect("ready"), 1);
    id
}

fn sequence_for(company: &str) -> EmailSequence {
    EmailSequence {
        subject_line: "quick question".into(),
        email_1: format!("Bonjour, vous recrutez chez {company}."),
        email_1_ps: Some("PS: bravo".into()),
        email_2: "Je relance.".into(),
        email_3: "Dernier message.".into(),
    }
}

fn fake_error(service: &str) -> LeadPipeError {
    LeadPipeError::provider(service, "HTTP 500 Internal Server Error")
}

// ---------------------------------------------------------------------------
// Job source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeJobSource {
    results: HashMap<String, Vec<JobPosting>>,
    failing: HashSet<String>,
}

impl FakeJobSource {
    pub fn with(mut self, keyword: &str, postings: Vec<JobPosting>) -> Self {
        self.results.insert(keyword.into(), postings);
        self
    }

    pub fn failing(mut self, keyword: &str) -> Self {
        self.failing.insert(keyword.into());
        self
    }
}

#[async_trait]
impl JobSource for FakeJobSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>> {
        if self.failing.contains(&query.keyword) {
            return Err(fake_error("fake-jobs"));
        }
        let mut found = self.results.get(&query.keyword).cloned().unwrap_or_default();
        found.truncate(query.limit);
        Ok(found)
    }
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeContacts {
    domains: HashMap<String, String>,
    profiles: HashMap<String, CompanyProfile>,
    contacts: HashMap<String, Contact>,
    verifications: HashMap<String, Verification>,
    failing_domains: HashSet<String>,
    domain_lookups: Mutex<Vec<String>>,
}

impl FakeContacts {
    pub fn company(mut self, name: &str, domain: &str, employees: &str, industry: &str) -> Self {
        self.domains.insert(name.into(), domain.into());
        self.profiles.insert(
            domain.into(),
            CompanyProfile {
                employee_range: Some(employees.into()),
                industry: Some(industry.into()),
                description: Some(format!("{name} does {industry}")),
            },
        );
        self
    }

    pub fn contact(mut self, domain: &str, email: &str, first: &str, last: &str, position: &str) -> Self {
        self.contacts.insert(
            domain.into(),
            Contact {
                email: email.into(),
                first_name: Some(first.into()),
                last_name: Some(last.into()),
                position: Some(position.into()),
            },
        );
        self
    }

    pub fn verification(mut self, email: &str, status: &str, score: i64) -> Self {
        self.verifications.insert(
            email.into(),
            Verification {
                status: status.into(),
                score,
            },
        );
        self
    }

    pub fn failing_domain(mut self, domain: &str) -> Self {
        self.failing_domains.insert(domain.into());
        self
    }

    /// How many times `find_domain` was called for `company_name`.
    pub fn lookups_for(&self, company_name: &str) -> usize {
        self.domain_lookups
            .lock()
            .expect("lock")
            .iter()
            .filter(|name| name.as_str() == company_name)
            .count()
    }
}

#[async_trait]
impl ContactDiscovery for FakeContacts {
    async fn find_domain(&self, company_name: &str) -> Result<Option<String>> {
        self.domain_lookups
            .lock()
            .expect("lock")
            .push(company_name.to_string());
        Ok(self.domains.get(company_name).cloned())
    }

    async fn company_profile(&self, domain: &str) -> Result<Option<CompanyProfile>> {
        Ok(self.profiles.get(domain).cloned())
    }

    async fn find_decision_maker(&self, domain: &str) -> Result<Option<Contact>> {
        if self.failing_domains.contains(domain) {
            return Err(fake_error("fake-contacts"));
        }
        Ok(self.contacts.get(domain).cloned())
    }

    async fn verify_email(&self, email: &str) -> Result<Verification> {
        Ok(self.verifications.get(email).cloned().unwrap_or(Verification {
            status: "unknown".into(),
            score: 0,
        }))
    }
}

// ---------------------------------------------------------------------------
// Classifier and copy
// ---------------------------------------------------------------------------

pub struct FakeClassifier {
    b2c_industries: HashSet<String>,
    fail: bool,
}

impl FakeClassifier {
    pub fn b2c_industries(industries: &[&str]) -> Self {
        Self {
            b2c_industries: industries.iter().map(|s| s.to_string()).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            b2c_industries: HashSet::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CompanyClassifier for FakeClassifier {
    async fn classify(&self, company: &CompanyInfo) -> Result<CompanyType> {
        if self.fail {
            return Err(fake_error("fake-llm"));
        }
        let b2c = company
            .industry
            .as_ref()
            .is_some_and(|i| self.b2c_industries.contains(i));
        Ok(if b2c { CompanyType::B2c } else { CompanyType::B2b })
    }
}

#[derive(Default)]
pub struct FakeCopy {
    blank: HashSet<String>,
    failing: HashSet<String>,
}

impl FakeCopy {
    /// Return a sequence with an empty body for `domain`.
    pub fn blank_for(mut self, domain: &str) -> Self {
        self.blank.insert(domain.into());
        self
    }

    pub fn failing_for(mut self, domain: &str) -> Self {
        self.failing.insert(domain.into());
        self
    }
}

#[async_trait]
impl CopyGenerator for FakeCopy {
    async fn generate(&self, prospect: &Prospect) -> Result<EmailSequence> {
        if self.failing.contains(&prospect.company_domain) {
            return Err(fake_error("fake-llm"));
        }
        let mut seq = sequence_for(&prospect.company_name);
        if self.blank.contains(&prospect.company_domain) {
            seq.email_2 = "  ".into();
        }
        Ok(seq)
    }
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSink {
    outcomes: HashMap<String, PushOutcome>,
    failing: HashSet<String>,
    pushed: Mutex<Vec<String>>,
}

impl FakeSink {
    pub fn outcome(mut self, email: &str, outcome: PushOutcome) -> Self {
        self.outcomes.insert(email.into(), outcome);
        self
    }

    /// Fail the request itself for `email`, as a transport or 5xx error would.
    pub fn failing_for(mut self, email: &str) -> Self {
        self.failing.insert(email.into());
        self
    }

    /// Emails pushed so far, in order.
    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().expect("lock").clone()
    }
}

#[async_trait]
impl CampaignSink for FakeSink {
    async fn push(&self, prospect: &Prospect) -> Result<PushOutcome> {
        let email = prospect
            .email
            .clone()
            .ok_or_else(|| LeadPipeError::validation("no email"))?;
        self.pushed.lock().expect("lock").push(email.clone());
        if self.failing.contains(&email) {
            return Err(fake_error("fake-campaign"));
        }
        Ok(self
            .outcomes
            .get(&email)
            .cloned()
            .unwrap_or(PushOutcome::Added))
    }
}
