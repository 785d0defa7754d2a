use tracing::{debug, info, warn};

use crate::notify::{AddressBook, AlertMessage, Notifier};
use crate::quota::{QuotaUsage, ReportCommand, UserQuotaRecord};
use crate::storage::QuotaStore;

use super::error::AlertError;

/// Counters describing one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub snapshot_size: usize,
    pub worklist_size: usize,
    pub notified: usize,
    pub failed: usize,
    pub reset: usize,
}

/// Runs reconciliation cycles against a store it borrows for its lifetime.
pub struct AlertCoordinator<'a, N> {
    store: &'a QuotaStore,
    notifier: N,
    addresses: AddressBook,
    hostname: String,
}

impl<'a, N: Notifier> AlertCoordinator<'a, N> {
    pub fn new(
        store: &'a QuotaStore,
        notifier: N,
        addresses: AddressBook,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            addresses,
            hostname: hostname.into(),
        }
    }

    pub async fn run_from(&self, source: &ReportCommand) -> Result<CycleSummary, AlertError> {
        let snapshot = source.collect().await?;
        self.run_cycle(snapshot).await
    }

    /// Persists the snapshot, alerts every user whose state is ahead of their
    /// alert level, then clears markers of users back under quota.
    ///
    /// A successful delivery is committed before the next user is attempted,
    /// so an interrupted cycle re-notifies at most the user in flight. Failed
    /// deliveries leave the marker alone and are retried next cycle. Any
    /// storage error aborts the cycle before stale markers are reset.
    pub async fn run_cycle(&self, snapshot: Vec<QuotaUsage>) -> Result<CycleSummary, AlertError> {
        let records: Vec<UserQuotaRecord> = snapshot
            .into_iter()
            .map(UserQuotaRecord::from_usage)
            .collect();

        let mut summary = CycleSummary {
            snapshot_size: self.store.upsert(&records)?,
            ..CycleSummary::default()
        };

        let worklist = self.store.users_needing_alert()?;
        summary.worklist_size = worklist.len();
        debug!(users = worklist.len(), "computed alert worklist");

        for record in &worklist {
            let Some(message) = AlertMessage::for_record(record, &self.hostname) else {
                continue;
            };
            let address = self.addresses.lookup(&record.user);

            match self.notifier.send(&record.user, address, &message).await {
                Ok(()) => {
                    self.store.mark_alerted(&record.user)?;
                    summary.notified += 1;
                    info!(
                        user = %record.user,
                        state = %record.state(),
                        "user notified of quota exceedance"
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(
                        user = %record.user,
                        state = %record.state(),
                        error = %err,
                        "alert not delivered, will retry next cycle"
                    );
                }
            }
        }

        summary.reset = self.store.reset_stale_alerts()?;
        Ok(summary)
    }
}
