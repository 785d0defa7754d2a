use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};

use super::database::QuotaStore;
use super::error::StorageError;

const CYCLE_LEASE: &str = "cycle";

/// Exclusive claim on running a cycle against a store. Released when dropped.
pub struct RunLease<'a> {
    store: &'a QuotaStore,
    holder: String,
    released: bool,
}

impl RunLease<'_> {
    pub fn release(mut self) -> Result<(), StorageError> {
        self.released = true;
        self.store.release_lease(&self.holder)
    }
}

impl Drop for RunLease<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.store.release_lease(&self.holder) {
            warn!(holder = %self.holder, error = %err, "failed to release run lease");
        }
    }
}

impl QuotaStore {
    /// Claims the cycle lease. A lease older than `ttl` is assumed to belong
    /// to a crashed run and is taken over.
    pub fn acquire_lease(&self, holder: &str, ttl: Duration) -> Result<RunLease<'_>, StorageError> {
        let now = Utc::now().timestamp();
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<(String, i64)> = tx
            .query_row(
                "SELECT holder, acquired_at FROM run_lease WHERE name = ?1",
                params![CYCLE_LEASE],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((current, acquired_at)) = existing {
            let age = now.saturating_sub(acquired_at);
            if age < ttl.as_secs() as i64 {
                return Err(StorageError::LeaseHeld {
                    holder: current,
                    acquired_at: format_timestamp(acquired_at),
                });
            }
            warn!(
                previous_holder = %current,
                age_secs = age,
                "taking over expired run lease"
            );
        }

        tx.execute(
            r#"
            INSERT INTO run_lease (name, holder, acquired_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                acquired_at = excluded.acquired_at
            "#,
            params![CYCLE_LEASE, holder, now],
        )?;
        tx.commit()?;
        debug!(holder, "acquired run lease");

        Ok(RunLease {
            store: self,
            holder: holder.to_string(),
            released: false,
        })
    }

    fn release_lease(&self, holder: &str) -> Result<(), StorageError> {
        let conn = self.connection()?;
        conn.execute(
            "DELETE FROM run_lease WHERE name = ?1 AND holder = ?2",
            params![CYCLE_LEASE, holder],
        )?;
        debug!(holder, "released run lease");
        Ok(())
    }
}

fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}
