//! LinkedIn public guest search pages, parsed with CSS selectors.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use leadpipe_shared::{JobSearchConfig, LeadPipeError, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use crate::{JobPosting, JobSource, SearchQuery, build_client, linkedin_search_url, parse_age_days};

const SERVICE: &str = "linkedin";

/// Guest endpoint returning bare result cards, 25 per page.
const GUEST_SEARCH_PATH: &str = "/jobs-guest/jobs/api/seeMoreJobPostings/search";
const PAGE_SIZE: usize = 25;
const MAX_PAGES: usize = 8;

static CARD: LazyLock<Selector> = LazyLock::new(|| sel(".base-search-card"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| sel(".base-search-card__title"));
static COMPANY: LazyLock<Selector> = LazyLock::new(|| sel(".base-search-card__subtitle"));
static LOCATION: LazyLock<Selector> = LazyLock::new(|| sel(".job-search-card__location"));
static LINK: LazyLock<Selector> = LazyLock::new(|| sel("a.base-card__full-link"));
static TIME: LazyLock<Selector> = LazyLock::new(|| sel("time"));

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Reads LinkedIn's unauthenticated job search endpoint page by page.
pub struct LinkedInGuestSource {
    client: Client,
    base_url: String,
    max_age_days: u32,
}

impl LinkedInGuestSource {
    pub fn new(config: &JobSearchConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            base_url: config.linkedin_base_url.clone(),
            max_age_days: config.max_age_days,
        })
    }

    async fn fetch_page(&self, query: &SearchQuery, start: usize) -> Result<String> {
        let url = linkedin_search_url(&self.base_url, GUEST_SEARCH_PATH, query, start)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LeadPipeError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadPipeError::provider(SERVICE, format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| LeadPipeError::Network(format!("{url}: failed to read body: {e}")))
    }
}

#[async_trait]
impl JobSource for LinkedInGuestSource {
    fn name(&self) -> &'static str {
        SERVICE
    }

    #[instrument(skip_all, fields(keyword = %query.keyword))]
    async fn search(&self, query: &SearchQuery) -> Result<Vec<JobPosting>> {
        let today = Utc::now().date_naive();
        let mut postings = Vec::new();

        for page in 0..MAX_PAGES {
            if postings.len() >= query.limit {
                break;
            }
            let html = match self.fetch_page(query, page * PAGE_SIZE).await {
                Ok(html) => html,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    warn!(page, kept = postings.len(), error = %e, "stopping pagination early");
                    break;
                }
            };
            let cards = parse_cards(&html, today);
            let found = cards.len();
            debug!(page, found, "parsed result page");

            postings.extend(
                cards
                    .into_iter()
                    .filter(|p| p.age_days.is_none_or(|age| age <= self.max_age_days)),
            );
            if found < PAGE_SIZE {
                break;
            }
        }

        postings.truncate(query.limit);
        Ok(postings)
    }
}

/// Extract postings from a page of result cards. Cards without a title or
/// company are skipped.
pub(crate) fn parse_cards(html: &str, today: NaiveDate) -> Vec<JobPosting> {
    let doc = Html::parse_document(html);
    doc.select(&CARD)
        .filter_map(|card| parse_card(card, today))
        .collect()
}

fn parse_card(card: ElementRef<'_>, today: NaiveDate) -> Option<JobPosting> {
    let job_title = text_of(card, &TITLE)?;
    let company_name = text_of(card, &COMPANY)?;

    let time = card.select(&TIME).next();
    let posted_date = time
        .and_then(|t| t.value().attr("datetime"))
        .map(str::to_string);
    let age_days = time
        .and_then(|t| parse_age_days(&t.text().collect::<String>()))
        .or_else(|| {
            let posted = NaiveDate::parse_from_str(posted_date.as_deref()?, "%Y-%m-%d").ok()?;
            u32::try_from((today - posted).num_days().max(0)).ok()
        });

    let job_url = card
        .select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| href.split('?').next().unwrap_or(href).to_string());

    Some(JobPosting {
        job_title,
        company_name,
        location: text_of(card, &LOCATION),
        job_url,
        posted_date,
        age_days,
        ..JobPosting::default()
    })
}

fn text_of(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text = el.select(selector).next()?.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}
