//! Language-model generated email sequences.

use std::sync::LazyLock;

use async_trait::async_trait;
use leadpipe_shared::{EmailSequence, LeadPipeError, Prospect, Result};
use regex::Regex;
use tracing::{debug, instrument};

use crate::{AnthropicClient, CopyGenerator};

static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Writes a "hiring signal" sequence: the company is hiring for a sales role,
/// so its outbound volume is about to grow.
pub struct LlmCopywriter {
    client: AnthropicClient,
}

impl LlmCopywriter {
    pub fn new(client: AnthropicClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CopyGenerator for LlmCopywriter {
    #[instrument(skip_all, fields(domain = %prospect.company_domain))]
    async fn generate(&self, prospect: &Prospect) -> Result<EmailSequence> {
        let prompt = build_prompt(prospect);
        let reply = self.client.complete(&prompt, None).await?;
        let sequence = parse_sequence(&reply)?;
        debug!(subject = %sequence.subject_line, "sequence generated");
        Ok(sequence)
    }
}

fn build_prompt(prospect: &Prospect) -> String {
    let job_title = prospect.job_title.as_deref().unwrap_or("sales representative");
    let contact = prospect.contact_name().unwrap_or_else(|| "unknown".into());
    let contact_title = prospect.title.as_deref().unwrap_or("decision maker");
    let industry = prospect.industry.as_deref().unwrap_or("unknown");

    format!(
        r#"You write short, direct B2B cold emails. No fluff, no links, no "hope you are well".

PROSPECT
- Company: {company}
- Industry: {industry}
- Role they are hiring for: {job_title}
- Contact: {contact}, {contact_title}

ANGLE
They are hiring for {job_title}. Within a month that hire will be sending outbound
email at volume. Ask, without pitching hard, whether their sending infrastructure
(dedicated domains, inbox rotation, warmup, SPF/DKIM/DMARC) is ready for it.

RULES
- subject_line: two words, lowercase, sounds like an internal email
- email_1: 60-80 words. Hook on the open role, the deliverability problem, one line
  on what we do, one line of social proof, soft call to action
- email_1_ps: one short personal postscript starting with "PS:"
- email_2 (sent 3 days later): 40-50 words, different angle (time saved or scale)
- email_3 (sent 7 days later): 30-40 words, polite breakup, door left open
- Write in French, professional and light in tone

Reply with valid JSON only, no markdown fences:
{{"subject_line": "...", "email_1": "...", "email_1_ps": "PS: ...", "email_2": "...", "email_3": "..."}}"#,
        company = prospect.company_name,
    )
}

/// Parse a model reply into a validated sequence. Accepts bare JSON or JSON
/// embedded in surrounding prose.
pub fn parse_sequence(reply: &str) -> Result<EmailSequence> {
    let trimmed = reply.trim();
    let sequence: EmailSequence = match serde_json::from_str(trimmed) {
        Ok(seq) => seq,
        Err(direct) => {
            let object = JSON_OBJECT_RE.find(trimmed).ok_or_else(|| {
                LeadPipeError::parse(format!("no JSON object in model reply: {direct}"))
            })?;
            serde_json::from_str(object.as_str())
                .map_err(|e| LeadPipeError::parse(format!("model reply is not a sequence: {e}")))?
        }
    };

    let sequence = EmailSequence {
        email_1_ps: sequence.email_1_ps.filter(|ps| !ps.trim().is_empty()),
        ..sequence
    };
    sequence.validate()?;
    Ok(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anthropic::tests::{client_for, mount_reply};
    use leadpipe_shared::{CompanyType, ProspectCandidate, ProspectStatus};

    const REPLY: &str = r#"{"subject_line": "infra email", "email_1": "Bonjour Jane", "email_1_ps": "PS: bravo", "email_2": "Je relance", "email_3": "Dernier message"}"#;

    fn prospect() -> Prospect {
        let mut p = Prospect::from_candidate(ProspectCandidate {
            company_name: "Acme".into(),
            company_domain: "acme.com".into(),
            company_type: CompanyType::B2b,
            employee_count: Some(50),
            employee_range: Some("11-50".into()),
            industry: Some("Software".into()),
            job_title: Some("VP Sales".into()),
            job_url: None,
            location: Some("Paris".into()),
            source_keyword: Some("VP Sales".into()),
            posted_date: None,
        });
        p.first_name = Some("Jane".into());
        p.last_name = Some("Doe".into());
        p.title = Some("CEO".into());
        p.status = ProspectStatus::Enriched;
        p
    }

    #[test]
    fn parses_bare_json() {
        let seq = parse_sequence(REPLY).unwrap();
        assert_eq!(seq.subject_line, "infra email");
        assert_eq!(seq.email_1_ps.as_deref(), Some("PS: bravo"));
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let reply = format!("Here is the sequence:\n```json\n{REPLY}\n```\nGood luck!");
        let seq = parse_sequence(&reply).unwrap();
        assert_eq!(seq.email_3, "Dernier message");
    }

    #[test]
    fn blank_postscript_becomes_none() {
        let reply = r#"{"subject_line": "s", "email_1": "a", "email_1_ps": " ", "email_2": "b", "email_3": "c"}"#;
        assert_eq!(parse_sequence(reply).unwrap().email_1_ps, None);
    }

    #[test]
    fn rejects_empty_or_missing_fields() {
        let empty = r#"{"subject_line": "s", "email_1": "", "email_2": "b", "email_3": "c"}"#;
        assert!(parse_sequence(empty).is_err());
        let missing = r#"{"subject_line": "s", "email_1": "a", "email_2": "b"}"#;
        assert!(parse_sequence(missing).is_err());
        assert!(parse_sequence("I cannot help with that.").is_err());
    }

    #[test]
    fn prompt_carries_prospect_context() {
        let prompt = build_prompt(&prospect());
        assert!(prompt.contains("Company: Acme"));
        assert!(prompt.contains("Role they are hiring for: VP Sales"));
        assert!(prompt.contains("Contact: Jane Doe, CEO"));
    }

    #[tokio::test]
    async fn generate_round_trips_through_the_api() {
        let server = wiremock::MockServer::start().await;
        mount_reply(&server, REPLY).await;

        let writer = LlmCopywriter::new(client_for(&server));
        let seq = writer.generate(&prospect()).await.unwrap();
        assert_eq!(seq.email_1, "Bonjour Jane");
    }
}
