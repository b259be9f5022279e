//! Candidate filtering: which resolved companies are allowed into the store.

use leadpipe_shared::{CompanyType, FiltersConfig, ProspectCandidate};

/// Why a candidate was kept out of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Sells to consumers.
    B2c,
    /// At or above the employee ceiling.
    TooLarge { employees: u32, max: u32 },
    /// Name matches the blocked-company list.
    Blocked { pattern: String },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::B2c => write!(f, "b2c"),
            Self::TooLarge { employees, max } => {
                write!(f, "{employees}+ employees (limit {max})")
            }
            Self::Blocked { pattern } => write!(f, "blocked company '{pattern}'"),
        }
    }
}

/// Pure predicate over candidates. Thresholds come from `[filters]`.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    max_employees: u32,
    blocked: Vec<String>,
}

impl CandidateFilter {
    pub fn new(max_employees: u32, blocked: &[String]) -> Self {
        Self {
            max_employees,
            blocked: blocked
                .iter()
                .map(|b| normalize_name(b))
                .filter(|b| !b.is_empty())
                .collect(),
        }
    }

    pub fn from_config(filters: &FiltersConfig) -> Self {
        Self::new(filters.max_employees, &filters.blocked_companies)
    }

    /// Blocked-list check alone, usable before a candidate is resolved.
    /// Matches whole words, so `meta` blocks "Meta Platforms" but not "Metadata".
    pub fn blocked_name(&self, company_name: &str) -> Option<Rejection> {
        let padded = format!(" {} ", normalize_name(company_name));
        self.blocked
            .iter()
            .find(|pattern| padded.contains(&format!(" {pattern} ")))
            .map(|pattern| Rejection::Blocked {
                pattern: pattern.clone(),
            })
    }

    /// `None` when the candidate may be stored.
    pub fn check(&self, candidate: &ProspectCandidate) -> Option<Rejection> {
        if candidate.company_type == CompanyType::B2c {
            return Some(Rejection::B2c);
        }
        if let Some(employees) = candidate.employee_count {
            if employees >= self.max_employees {
                return Some(Rejection::TooLarge {
                    employees,
                    max: self.max_employees,
                });
            }
        }
        self.blocked_name(&candidate.company_name)
    }
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
