//! SQLite store implementation
//!
//! This module provides a SQLite-based implementation of the OpportunityStore trait.

use crate::contact::ContactRecord;
use crate::pipeline::BatchSummary;
use crate::store::schema::initialize_schema;
use crate::store::traits::{OpportunityStore, StorageError, StorageResult};
use crate::store::{
    BatchRunRecord, CandidateSelector, Opportunity, OpportunityStatus, OpportunityUpdate,
    RunStatus,
};
use crate::url::{extract_domain, parse_target};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;
use std::path::Path;

const OPPORTUNITY_COLUMNS: &str = "id, domain, url, status, domain_authority, spam_score, \
     is_premium, validation_data, contact_info, created_at, updated_at";

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, processed, passing, premium, failed";

/// SQLite opportunity store
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Raw connection, for tests that need to plant legacy rows
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &BatchSummary,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE batch_runs SET status = ?1, finished_at = ?2, processed = ?3, passing = ?4,
             premium = ?5, failed = ?6 WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                summary.processed as i64,
                summary.passing as i64,
                summary.premium as i64,
                summary.failed as i64,
                run_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }
}

/// Raw column values of one opportunity row
struct OpportunityRow {
    id: i64,
    domain: String,
    url: String,
    status: String,
    domain_authority: Option<f64>,
    spam_score: Option<f64>,
    is_premium: bool,
    validation_data: Option<String>,
    contact_info: Option<String>,
    created_at: String,
    updated_at: String,
}

impl OpportunityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            domain: row.get(1)?,
            url: row.get(2)?,
            status: row.get(3)?,
            domain_authority: row.get(4)?,
            spam_score: row.get(5)?,
            is_premium: row.get(6)?,
            validation_data: row.get(7)?,
            contact_info: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    /// Decodes the row, repairing what older writers left behind
    fn into_opportunity(self) -> Opportunity {
        let domain = if self.domain.trim().is_empty() {
            parse_target(&self.url)
                .ok()
                .and_then(|u| extract_domain(&u))
                .unwrap_or_default()
        } else {
            self.domain
        };

        let status = OpportunityStatus::from_db_string(&self.status).unwrap_or_else(|| {
            tracing::warn!(
                "Opportunity {} has unknown status '{}', treating as discovered",
                self.id,
                self.status
            );
            OpportunityStatus::Discovered
        });

        let validation_data = self
            .validation_data
            .as_deref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(Default::default()));

        let contact_info = self.contact_info.as_deref().and_then(|raw| {
            let record = ContactRecord::from_stored(raw);
            if record.is_none() {
                tracing::warn!("Opportunity {} has unreadable contact info, ignoring it", self.id);
            }
            record
        });

        Opportunity {
            id: self.id,
            domain,
            url: self.url,
            status,
            domain_authority: self.domain_authority,
            spam_score: self.spam_score,
            is_premium: self.is_premium,
            validation_data,
            contact_info,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<BatchRunRecord> {
    Ok(BatchRunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        processed: row.get::<_, i64>(5)? as u64,
        passing: row.get::<_, i64>(6)? as u64,
        premium: row.get::<_, i64>(7)? as u64,
        failed: row.get::<_, i64>(8)? as u64,
    })
}

impl OpportunityStore for SqliteStore {
    // ===== Opportunities =====

    fn insert_opportunity(&mut self, url: &str, domain: &str) -> StorageResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM opportunities WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let contact_info = ContactRecord::empty()
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO opportunities (domain, url, status, contact_info, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                domain,
                url,
                OpportunityStatus::Discovered.to_db_string(),
                contact_info,
                now
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_opportunity(&self, id: i64) -> StorageResult<Opportunity> {
        let sql = format!("SELECT {} FROM opportunities WHERE id = ?1", OPPORTUNITY_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], OpportunityRow::from_row)
            .optional()?
            .ok_or(StorageError::OpportunityNotFound(id))?;

        Ok(row.into_opportunity())
    }

    fn find_by_url(&self, url: &str) -> StorageResult<Option<Opportunity>> {
        let sql = format!("SELECT {} FROM opportunities WHERE url = ?1", OPPORTUNITY_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![url], OpportunityRow::from_row)
            .optional()?;

        Ok(row.map(OpportunityRow::into_opportunity))
    }

    fn list_unprocessed(
        &self,
        selector: &CandidateSelector,
        limit: usize,
    ) -> StorageResult<Vec<Opportunity>> {
        let mut sql = format!("SELECT {} FROM opportunities", OPPORTUNITY_COLUMNS);
        let mut conditions = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if !selector.statuses.is_empty() {
            let placeholders: Vec<String> = selector
                .statuses
                .iter()
                .map(|status| {
                    values.push(SqlValue::Text(status.to_db_string().to_string()));
                    format!("?{}", values.len())
                })
                .collect();
            conditions.push(format!("status IN ({})", placeholders.join(", ")));
        }
        if selector.premium_only {
            conditions.push("is_premium = 1".to_string());
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        // Contact satisfaction lives inside JSON that may predate the current
        // shape, so that filter runs on decoded records.
        if !selector.missing_contacts {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), OpportunityRow::from_row)?;

        let mut selected = Vec::new();
        for row in rows {
            let opportunity = row?.into_opportunity();
            if selector.matches(&opportunity) {
                selected.push(opportunity);
                if selected.len() >= limit {
                    break;
                }
            }
        }

        Ok(selected)
    }

    fn update_opportunity(&mut self, id: i64, update: &OpportunityUpdate) -> StorageResult<()> {
        let mut sets = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        let mut set = |column: &str, value: SqlValue| {
            values.push(value);
            sets.push(format!("{} = ?{}", column, values.len()));
        };

        if let Some(status) = update.status {
            set("status", SqlValue::Text(status.to_db_string().to_string()));
        }
        if let Some(da) = update.domain_authority {
            set("domain_authority", SqlValue::Real(da));
        }
        if let Some(spam) = update.spam_score {
            set("spam_score", SqlValue::Real(spam));
        }
        if let Some(is_premium) = update.is_premium {
            set("is_premium", SqlValue::Integer(i64::from(is_premium)));
        }
        if let Some(data) = &update.validation_data {
            let json = serde_json::to_string(data)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            set("validation_data", SqlValue::Text(json));
        }
        if let Some(contact_info) = &update.contact_info {
            let json = contact_info
                .to_json()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            set("contact_info", SqlValue::Text(json));
        }
        set("updated_at", SqlValue::Text(Utc::now().to_rfc3339()));

        values.push(SqlValue::Integer(id));
        let sql = format!(
            "UPDATE opportunities SET {} WHERE id = ?{}",
            sets.join(", "),
            values.len()
        );

        let changed = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        if changed == 0 {
            return Err(StorageError::OpportunityNotFound(id));
        }
        Ok(())
    }

    // ===== Statistics =====

    fn count_by_status(&self, status: OpportunityStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM opportunities WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM opportunities", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_with_contacts(&self) -> StorageResult<u64> {
        let mut stmt = self
            .conn
            .prepare("SELECT contact_info FROM opportunities WHERE contact_info IS NOT NULL")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut count = 0;
        for raw in rows {
            if ContactRecord::from_stored(&raw?).map_or(false, |c| c.is_satisfied()) {
                count += 1;
            }
        }
        Ok(count)
    }

    // ===== Batch runs =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO batch_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, summary: &BatchSummary) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed, summary)
    }

    fn fail_run(&mut self, run_id: i64, summary: &BatchSummary) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed, summary)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<BatchRunRecord> {
        let sql = format!("SELECT {} FROM batch_runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn recent_runs(&self, limit: usize) -> StorageResult<Vec<BatchRunRecord>> {
        let sql = format!(
            "SELECT {} FROM batch_runs ORDER BY id DESC LIMIT {}",
            RUN_COLUMNS, limit
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let runs = stmt
            .query_map([], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
