//! Lead persistence
//!
//! SQLite store for finalized lead summaries. The running conversation state
//! is never stored here; clients carry it between turns.

mod schema;

use crate::leads::LeadSummary;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use schema::SCHEMA;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Lead not found: {0}")]
    LeadNotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe lead store handle
#[derive(Clone)]
pub struct LeadStore {
    conn: Arc<Mutex<Connection>>,
}

impl LeadStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a finalized lead summary, returning its id.
    pub fn insert_lead_summary(&self, summary: &LeadSummary) -> DbResult<String> {
        let conn = self.conn.lock().unwrap();
        let capabilities = serde_json::to_string(&summary.capabilities_shown)?;

        conn.execute(
            "INSERT INTO lead_summaries
                 (id, session_id, name, email, company_name, company_domain,
                  industry, capabilities_shown, score, digest, follow_up_email,
                  created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                summary.id,
                summary.session_id,
                summary.name,
                summary.email,
                summary.company_name,
                summary.company_domain,
                summary.industry,
                capabilities,
                summary.score,
                summary.digest,
                summary.follow_up_email,
                summary.created_at.to_rfc3339(),
            ],
        )?;

        Ok(summary.id.clone())
    }

    /// Get a lead summary by id.
    pub fn get_lead_summary(&self, id: &str) -> DbResult<LeadSummary> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, name, email, company_name, company_domain,
                    industry, capabilities_shown, score, digest, follow_up_email,
                    created_at
             FROM lead_summaries WHERE id = ?1",
        )?;

        stmt.query_row(params![id], row_to_summary).map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::LeadNotFound(id.to_string()),
            other => DbError::Sqlite(other),
        })
    }

    /// List all stored lead summaries, newest first.
    pub fn list_lead_summaries(&self) -> DbResult<Vec<LeadSummary>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, session_id, name, email, company_name, company_domain,
                    industry, capabilities_shown, score, digest, follow_up_email,
                    created_at
             FROM lead_summaries ORDER BY created_at DESC, id",
        )?;

        let rows = stmt.query_map([], row_to_summary)?;
        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<LeadSummary> {
    let capabilities_json: String = row.get(7)?;
    let capabilities_shown: Vec<String> =
        serde_json::from_str(&capabilities_json).unwrap_or_default();

    Ok(LeadSummary {
        id: row.get(0)?,
        session_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        company_name: row.get(4)?,
        company_domain: row.get(5)?,
        industry: row.get(6)?,
        capabilities_shown,
        score: row.get(8)?,
        digest: row.get(9)?,
        follow_up_email: row.get(10)?,
        created_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
