//! SQL migration definitions for the prospect database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a list of SQL batches executed in sequence.

/// A database migration with a version and SQL batches.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub steps: &'static [&'static str],
}

const SCHEMA_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Prospect table and its indexes. Also used by [`crate::Storage::reset`].
pub(crate) const PROSPECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS prospects (
    id                  TEXT PRIMARY KEY,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,

    company_name        TEXT NOT NULL,
    job_title           TEXT,
    job_url             TEXT,
    location            TEXT,
    source_keyword      TEXT,
    posted_date         TEXT,

    company_domain      TEXT NOT NULL,
    company_type        TEXT NOT NULL DEFAULT 'b2b',
    employee_range      TEXT,
    industry            TEXT,
    email               TEXT,
    first_name          TEXT,
    last_name           TEXT,
    title               TEXT,
    verification_status TEXT,
    verification_score  INTEGER,

    subject_line        TEXT,
    email_1             TEXT,
    email_1_ps          TEXT,
    email_2             TEXT,
    email_3             TEXT,

    status              TEXT NOT NULL DEFAULT 'ready',
    sent_at             TEXT,
    last_error          TEXT,

    UNIQUE(company_domain)
);

CREATE INDEX IF NOT EXISTS idx_prospects_status ON prospects(status);
CREATE INDEX IF NOT EXISTS idx_prospects_domain ON prospects(company_domain);
"#;

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: prospects with unique company domain",
        steps: &[
            SCHEMA_MIGRATIONS_TABLE,
            PROSPECTS_TABLE,
            "INSERT INTO schema_migrations (version) VALUES (1);",
        ],
    }]
}
