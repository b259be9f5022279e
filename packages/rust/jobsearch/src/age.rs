//! Relative posting-age parsing ("3 days ago", "il y a 2 semaines").

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

/// Age in whole days of a LinkedIn-style relative date, in English or French.
///
/// Hours and minutes count as 0 days. Months count as 30 days each.
/// Returns `None` for text with no recognizable unit.
pub fn parse_age_days(text: &str) -> Option<u32> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let n = NUMBER_RE
        .captures(&lower)
        .and_then(|c| c[1].parse::<u32>().ok());

    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["today", "aujourd", "just now", "minute", "hour", "heure"]) {
        Some(0)
    } else if has(&["day", "jour"]) {
        Some(n.unwrap_or(1))
    } else if has(&["week", "semaine"]) {
        Some(n.unwrap_or(1).saturating_mul(7))
    } else if has(&["month", "mois"]) {
        Some(n.unwrap_or(1).saturating_mul(30))
    } else if lower
        .split_whitespace()
        .any(|w| matches!(w, "year" | "years" | "an" | "ans"))
        && n.is_some()
    {
        Some(n.unwrap_or(1).saturating_mul(365))
    } else {
        None
    }
}
