use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// One recorded login or renewal attempt. Credentials are never stored,
/// only the userid and the envelope-level outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: String,
    pub userid: String,
    pub action: String,
    pub outcome: String,
    pub item_id: Option<i64>,
    pub created_at: String,
}

/// SQLite-backed log of portal attempts.
pub struct AttemptLog {
    conn: Connection,
}

impl AttemptLog {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path).context("Failed to open history database")?;
        let log = Self { conn };
        log.initialize_schema()?;
        Ok(log)
    }

    /// In-memory database, used by tests.
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to create in-memory database")?;
        let log = Self { conn };
        log.initialize_schema()?;
        Ok(log)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS attempts (
                    id TEXT PRIMARY KEY,
                    userid TEXT NOT NULL,
                    action TEXT NOT NULL,
                    outcome TEXT NOT NULL,
                    item_id INTEGER,
                    created_at TEXT NOT NULL
                )",
                [],
            )
            .context("Failed to create attempts table")?;
        Ok(())
    }

    pub fn record(
        &self,
        userid: &str,
        action: &str,
        outcome: &str,
        item_id: Option<i64>,
    ) -> Result<AttemptRecord> {
        let record = AttemptRecord {
            id: Uuid::new_v4().to_string(),
            userid: userid.to_string(),
            action: action.to_string(),
            outcome: outcome.to_string(),
            item_id,
            created_at: chrono::Local::now().to_rfc3339(),
        };

        self.conn
            .execute(
                "INSERT INTO attempts (id, userid, action, outcome, item_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.userid,
                    record.action,
                    record.outcome,
                    record.item_id,
                    record.created_at,
                ],
            )
            .context("Failed to record attempt")?;

        Ok(record)
    }

    /// Most recent attempts first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, userid, action, outcome, item_id, created_at
                 FROM attempts ORDER BY created_at DESC LIMIT ?1",
            )
            .context("Failed to prepare history query")?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(AttemptRecord {
                    id: row.get(0)?,
                    userid: row.get(1)?,
                    action: row.get(2)?,
                    outcome: row.get(3)?,
                    item_id: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .context("Failed to query history")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.context("Failed to read history row")?);
        }
        Ok(records)
    }

    /// Delete all records, returning how many were removed.
    pub fn clear(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM attempts", [])
            .context("Failed to clear history")
    }
}
