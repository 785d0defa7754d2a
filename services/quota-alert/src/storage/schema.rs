use rusqlite::Connection;

use super::error::StorageError;

// state and alert hold QuotaState ordinals.
pub const USERQUOTA_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS userquota (
    user TEXT PRIMARY KEY,
    used INTEGER DEFAULT 0,
    soft_limit INTEGER DEFAULT 0,
    hard_limit INTEGER DEFAULT 0,
    state INTEGER DEFAULT 0,
    alert INTEGER DEFAULT 0
);
"#;

pub const RUN_LEASE_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS run_lease (
    name TEXT PRIMARY KEY,
    holder TEXT NOT NULL,
    acquired_at INTEGER NOT NULL
);
"#;

pub const USERQUOTA_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_userquota_alert_state ON userquota(alert, state);
"#;

pub fn init_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(USERQUOTA_TABLE_SCHEMA)?;
    conn.execute_batch(RUN_LEASE_TABLE_SCHEMA)?;
    conn.execute_batch(USERQUOTA_INDEXES)?;
    Ok(())
}
