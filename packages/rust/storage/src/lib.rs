//! Embedded libSQL prospect store.
//!
//! The [`Storage`] struct wraps a single-table libSQL database holding one row
//! per unique company domain. The `status` column drives which stage picks a
//! row up next.
//!
//! **Guarantees enforced here, not by callers:**
//! - `company_domain` is unique; a duplicate insert is a [`UpsertOutcome::Skipped`]
//! - a status patch only applies when the current status is a legal predecessor
//! - `sent_at` is written at most once

mod migrations;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use leadpipe_shared::{
    CompanyType, LeadPipeError, Prospect, ProspectId, ProspectPatch, ProspectStatus, Result,
};
use libsql::{Connection, Database, Value, params, params_from_iter};

/// Columns in the order [`row_to_prospect`] reads them.
const PROSPECT_COLUMNS: &str = "id, created_at, updated_at, company_name, job_title, job_url, \
     location, source_keyword, posted_date, company_domain, company_type, employee_range, \
     industry, email, first_name, last_name, title, verification_status, verification_score, \
     subject_line, email_1, email_1_ps, email_2, email_3, status, sent_at, last_error";

/// Result of [`Storage::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was written.
    Inserted,
    /// A row with the same company domain already existed; nothing changed.
    Skipped,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LeadPipeError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    ///
    /// Fails instead of creating the file when nothing is there yet.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LeadPipeError::Storage(format!(
                "no prospect store at {}",
                path.display()
            )));
        }
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version <= current_version {
                continue;
            }
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            for step in migration.steps {
                self.conn.execute_batch(step).await.map_err(|e| {
                    LeadPipeError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(LeadPipeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert `prospect` unless a row with its company domain already exists.
    pub async fn upsert(&self, prospect: &Prospect) -> Result<UpsertOutcome> {
        self.check_writable()?;
        let sql = format!(
            "INSERT INTO prospects ({PROSPECT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)
             ON CONFLICT(company_domain) DO NOTHING"
        );
        let values = vec![
            text(prospect.id.to_string()),
            text(prospect.created_at.to_rfc3339()),
            text(prospect.updated_at.to_rfc3339()),
            text(prospect.company_name.clone()),
            opt_text(&prospect.job_title),
            opt_text(&prospect.job_url),
            opt_text(&prospect.location),
            opt_text(&prospect.source_keyword),
            opt_text(&prospect.posted_date),
            text(prospect.company_domain.clone()),
            text(prospect.company_type.as_str()),
            opt_text(&prospect.employee_range),
            opt_text(&prospect.industry),
            opt_text(&prospect.email),
            opt_text(&prospect.first_name),
            opt_text(&prospect.last_name),
            opt_text(&prospect.title),
            opt_text(&prospect.verification_status),
            prospect
                .verification_score
                .map(Value::Integer)
                .unwrap_or(Value::Null),
            opt_text(&prospect.subject_line),
            opt_text(&prospect.email_1),
            opt_text(&prospect.email_1_ps),
            opt_text(&prospect.email_2),
            opt_text(&prospect.email_3),
            text(prospect.status.as_str()),
            prospect
                .sent_at
                .map(|at| text(at.to_rfc3339()))
                .unwrap_or(Value::Null),
            opt_text(&prospect.last_error),
        ];

        let affected = self
            .conn
            .execute(&sql, params_from_iter(values))
            .await
            .map_err(db_err)?;

        if affected == 0 {
            tracing::debug!(domain = %prospect.company_domain, "domain already stored, skipping");
            Ok(UpsertOutcome::Skipped)
        } else {
            Ok(UpsertOutcome::Inserted)
        }
    }

    /// Apply `patch` to the row with `id`. Returns the number of rows changed
    /// (0 when the row is missing or a guard rejected the patch).
    pub async fn update(&self, id: &ProspectId, patch: &ProspectPatch) -> Result<u64> {
        self.check_writable()?;
        if patch.is_empty() {
            return Ok(0);
        }

        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        let text_fields: [(&'static str, &Option<String>); 10] = [
            ("email", &patch.email),
            ("first_name", &patch.first_name),
            ("last_name", &patch.last_name),
            ("title", &patch.title),
            ("verification_status", &patch.verification_status),
            ("subject_line", &patch.subject_line),
            ("email_1", &patch.email_1),
            ("email_1_ps", &patch.email_1_ps),
            ("email_2", &patch.email_2),
            ("email_3", &patch.email_3),
        ];
        for (column, value) in text_fields {
            if let Some(v) = value {
                sets.push(column);
                values.push(text(v.clone()));
            }
        }
        if let Some(score) = patch.verification_score {
            sets.push("verification_score");
            values.push(Value::Integer(score));
        }
        if let Some(status) = patch.status {
            sets.push("status");
            values.push(text(status.as_str()));
        }
        if let Some(at) = patch.sent_at {
            sets.push("sent_at");
            values.push(text(at.to_rfc3339()));
        }
        if let Some(err) = &patch.last_error {
            sets.push("last_error");
            values.push(err.clone().map(text).unwrap_or(Value::Null));
        }
        sets.push("updated_at");
        values.push(text(Utc::now().to_rfc3339()));

        let mut sql = String::from("UPDATE prospects SET ");
        let assignments: Vec<String> = sets
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .collect();
        sql.push_str(&assignments.join(", "));

        values.push(text(id.to_string()));
        sql.push_str(&format!(" WHERE id = ?{}", values.len()));

        if let Some(status) = patch.status {
            let allowed = status.predecessors();
            if allowed.is_empty() {
                return Err(LeadPipeError::validation(format!(
                    "status '{status}' can only be set on insert"
                )));
            }
            let mut placeholders = Vec::with_capacity(allowed.len());
            for prev in allowed {
                values.push(text(prev.as_str()));
                placeholders.push(format!("?{}", values.len()));
            }
            sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
        }
        if patch.sent_at.is_some() {
            sql.push_str(" AND sent_at IS NULL");
        }

        let affected = self
            .conn
            .execute(&sql, params_from_iter(values))
            .await
            .map_err(db_err)?;

        if affected == 0 {
            tracing::debug!(%id, status = ?patch.status, "update matched no rows");
        }
        Ok(affected)
    }

    /// Drop and recreate the prospect table. Destroys every record.
    pub async fn reset(&self) -> Result<()> {
        self.check_writable()?;
        tracing::warn!("dropping prospects table");
        self.conn
            .execute_batch("DROP TABLE IF EXISTS prospects;")
            .await
            .map_err(db_err)?;
        self.conn
            .execute_batch(migrations::PROSPECTS_TABLE)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// All prospects with `status`, oldest first.
    pub async fn list(&self, status: ProspectStatus) -> Result<Vec<Prospect>> {
        let sql = format!(
            "SELECT {PROSPECT_COLUMNS} FROM prospects WHERE status = ?1 ORDER BY created_at, id"
        );
        self.query_prospects(&sql, vec![text(status.as_str())]).await
    }

    /// At most `limit` prospects with `status`, oldest first.
    pub async fn list_limited(&self, status: ProspectStatus, limit: usize) -> Result<Vec<Prospect>> {
        let sql = format!(
            "SELECT {PROSPECT_COLUMNS} FROM prospects WHERE status = ?1
             ORDER BY created_at, id LIMIT ?2"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_prospects(&sql, vec![text(status.as_str()), Value::Integer(limit)])
            .await
    }

    /// Fetch one prospect by id.
    pub async fn get(&self, id: &ProspectId) -> Result<Option<Prospect>> {
        let sql = format!("SELECT {PROSPECT_COLUMNS} FROM prospects WHERE id = ?1");
        Ok(self
            .query_prospects(&sql, vec![text(id.to_string())])
            .await?
            .into_iter()
            .next())
    }

    /// Fetch the prospect stored for `domain`, if any.
    pub async fn find_by_domain(&self, domain: &str) -> Result<Option<Prospect>> {
        let sql = format!("SELECT {PROSPECT_COLUMNS} FROM prospects WHERE company_domain = ?1");
        Ok(self
            .query_prospects(&sql, vec![text(domain)])
            .await?
            .into_iter()
            .next())
    }

    /// Number of prospects per status. Statuses with no rows are absent.
    pub async fn count_by_status(&self) -> Result<BTreeMap<ProspectStatus, u64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT status, COUNT(*) FROM prospects GROUP BY status",
                params![],
            )
            .await
            .map_err(db_err)?;

        let mut counts = BTreeMap::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let status: String = row.get(0).map_err(db_err)?;
            let count: i64 = row.get(1).map_err(db_err)?;
            match status.parse::<ProspectStatus>() {
                Ok(status) => {
                    counts.insert(status, count.max(0) as u64);
                }
                Err(_) => tracing::warn!(%status, count, "ignoring rows with unknown status"),
            }
        }
        Ok(counts)
    }

    /// Total number of stored prospects.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM prospects", params![])
            .await
            .map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(db_err)?.max(0) as u64),
            None => Ok(0),
        }
    }

    async fn query_prospects(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Prospect>> {
        let mut rows = self
            .conn
            .query(sql, params_from_iter(values))
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_prospect(&row)?);
        }
        Ok(results)
    }
}

fn db_err(e: libsql::Error) -> LeadPipeError {
    LeadPipeError::Storage(e.to_string())
}

fn text(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LeadPipeError::Storage(format!("invalid timestamp '{raw}': {e}")))
}

/// Convert a database row (selected with [`PROSPECT_COLUMNS`]) to a [`Prospect`].
fn row_to_prospect(row: &libsql::Row) -> Result<Prospect> {
    let id: String = row.get(0).map_err(db_err)?;
    let created_at: String = row.get(1).map_err(db_err)?;
    let updated_at: String = row.get(2).map_err(db_err)?;
    let company_type: String = row.get(10).map_err(db_err)?;
    let status: String = row.get(24).map_err(db_err)?;

    Ok(Prospect {
        id: id
            .parse()
            .map_err(|e| LeadPipeError::Storage(format!("invalid prospect id '{id}': {e}")))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        company_name: row.get(3).map_err(db_err)?,
        job_title: row.get::<String>(4).ok(),
        job_url: row.get::<String>(5).ok(),
        location: row.get::<String>(6).ok(),
        source_keyword: row.get::<String>(7).ok(),
        posted_date: row.get::<String>(8).ok(),
        company_domain: row.get(9).map_err(db_err)?,
        company_type: company_type
            .parse::<CompanyType>()
            .map_err(|e| LeadPipeError::Storage(e.to_string()))?,
        employee_range: row.get::<String>(11).ok(),
        industry: row.get::<String>(12).ok(),
        email: row.get::<String>(13).ok(),
        first_name: row.get::<String>(14).ok(),
        last_name: row.get::<String>(15).ok(),
        title: row.get::<String>(16).ok(),
        verification_status: row.get::<String>(17).ok(),
        verification_score: row.get::<i64>(18).ok(),
        subject_line: row.get::<String>(19).ok(),
        email_1: row.get::<String>(20).ok(),
        email_1_ps: row.get::<String>(21).ok(),
        email_2: row.get::<String>(22).ok(),
        email_3: row.get::<String>(23).ok(),
        status: status
            .parse::<ProspectStatus>()
            .map_err(|e| LeadPipeError::Storage(e.to_string()))?,
        sent_at: match row.get::<String>(25).ok() {
            Some(raw) => Some(parse_timestamp(&raw)?),
            None => None,
        },
        last_error: row.get::<String>(26).ok(),
    })
}
