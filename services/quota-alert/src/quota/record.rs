use serde::Serialize;

use super::state::QuotaState;
use super::KB_PER_GB;

/// One row of a quota report, before any state has been derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaUsage {
    pub user: String,
    pub used: u64,
    pub soft_limit: u64,
    pub hard_limit: u64,
}

impl QuotaUsage {
    pub fn new(user: impl Into<String>, used: u64, soft_limit: u64, hard_limit: u64) -> Self {
        Self {
            user: user.into(),
            used,
            soft_limit,
            hard_limit,
        }
    }

    pub fn has_limits(&self) -> bool {
        self.soft_limit > 0 || self.hard_limit > 0
    }
}

/// Persisted view of a user's quota. `state` is always derived from the
/// usage figures and `alert_level` only moves through the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserQuotaRecord {
    pub user: String,
    pub used: u64,
    pub soft_limit: u64,
    pub hard_limit: u64,
    pub(crate) state: QuotaState,
    pub(crate) alert_level: QuotaState,
}

impl UserQuotaRecord {
    pub fn from_usage(usage: QuotaUsage) -> Self {
        let state = QuotaState::evaluate(usage.used, usage.soft_limit, usage.hard_limit);
        Self {
            user: usage.user,
            used: usage.used,
            soft_limit: usage.soft_limit,
            hard_limit: usage.hard_limit,
            state,
            alert_level: QuotaState::Normal,
        }
    }

    pub fn state(&self) -> QuotaState {
        self.state
    }

    pub fn alert_level(&self) -> QuotaState {
        self.alert_level
    }

    pub fn needs_alert(&self) -> bool {
        self.alert_level < self.state
    }

    pub fn used_gb(&self) -> f64 {
        self.used as f64 / KB_PER_GB
    }

    pub fn soft_limit_gb(&self) -> f64 {
        self.soft_limit as f64 / KB_PER_GB
    }

    pub fn hard_limit_gb(&self) -> f64 {
        self.hard_limit as f64 / KB_PER_GB
    }
}
