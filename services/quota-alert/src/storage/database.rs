use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, Row, TransactionBehavior};
use tracing::{debug, info};

use crate::quota::{QuotaState, UserQuotaRecord};

use super::error::StorageError;
use super::schema::init_database;

const RECORD_COLUMNS: &str = "user, used, soft_limit, hard_limit, state, alert";

/// Durable per-user quota table. Every public operation is its own committed
/// transaction, so callers never have to finalize a write themselves.
pub struct QuotaStore {
    conn: Mutex<Connection>,
}

impl QuotaStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        init_database(&conn)?;
        debug!(path = %path.display(), "opened quota store");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(super) fn connection(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::ConnectionPoisoned)
    }

    /// Inserts or replaces usage, limits and state for every record in one
    /// transaction. The alert level of existing rows is never touched; new
    /// rows start at `Normal`.
    pub fn upsert(&self, records: &[UserQuotaRecord]) -> Result<usize, StorageError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO userquota (user, used, soft_limit, hard_limit, state, alert)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(user) DO UPDATE SET
                    used = excluded.used,
                    soft_limit = excluded.soft_limit,
                    hard_limit = excluded.hard_limit,
                    state = excluded.state
                "#,
            )?;

            for record in records {
                stmt.execute(params![
                    record.user,
                    record.used as i64,
                    record.soft_limit as i64,
                    record.hard_limit as i64,
                    record.state,
                    QuotaState::Normal,
                ])?;
            }
        }

        tx.commit()?;
        debug!(records = records.len(), "upserted quota snapshot");
        Ok(records.len())
    }

    /// Users whose current state is worse than their last delivered alert.
    pub fn users_needing_alert(&self) -> Result<Vec<UserQuotaRecord>, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM userquota WHERE alert < state ORDER BY user"
        ))?;

        let rows = stmt.query_map([], record_from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Raises the user's alert level to their current state and commits
    /// before returning.
    pub fn mark_alerted(&self, user: &str) -> Result<(), StorageError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE userquota SET alert = state WHERE user = ?1",
            params![user],
        )?;
        if updated == 0 {
            return Err(StorageError::UnknownUser(user.to_string()));
        }

        tx.commit()?;
        debug!(user, "marked user as alerted");
        Ok(())
    }

    /// Clears alert markers for users back to normal, and lowers any marker
    /// that is ahead of its state, so a later exceedance counts as new.
    pub fn reset_stale_alerts(&self) -> Result<usize, StorageError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let reset = tx.execute(
            r#"
            UPDATE userquota
            SET alert = state
            WHERE alert > state
            "#,
            [],
        )?;

        tx.commit()?;
        if reset > 0 {
            info!(reset, "reset stale alert markers");
        }
        Ok(reset)
    }

    pub fn query_all(&self) -> Result<Vec<UserQuotaRecord>, StorageError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM userquota ORDER BY user"
        ))?;

        let rows = stmt.query_map([], record_from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Removes every stored record. Administrative reset only.
    pub fn truncate(&self) -> Result<usize, StorageError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM userquota", [])?;
        tx.commit()?;

        info!(removed, "truncated quota store");
        Ok(removed)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<UserQuotaRecord> {
    Ok(UserQuotaRecord {
        user: row.get(0)?,
        used: row.get::<_, i64>(1)? as u64,
        soft_limit: row.get::<_, i64>(2)? as u64,
        hard_limit: row.get::<_, i64>(3)? as u64,
        state: row.get(4)?,
        alert_level: row.get(5)?,
    })
}
