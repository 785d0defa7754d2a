use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

/// Quota condition of a single user, ordered from best to worst.
///
/// The same domain is used for the persisted alert level, so `alert < state`
/// means the user is in a worse condition than the last delivered alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum QuotaState {
    #[default]
    Normal = 0,
    SoftExceeded = 1,
    HardExceeded = 2,
}

impl QuotaState {
    /// Classifies usage against its limits. The first matching rule wins:
    /// under the soft limit is normal, under the hard limit is soft-exceeded,
    /// anything else is hard-exceeded. Reaching a limit exactly counts as
    /// exceeding it.
    pub fn evaluate(used: u64, soft_limit: u64, hard_limit: u64) -> Self {
        if used < soft_limit {
            QuotaState::Normal
        } else if used < hard_limit {
            QuotaState::SoftExceeded
        } else {
            QuotaState::HardExceeded
        }
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            0 => Some(QuotaState::Normal),
            1 => Some(QuotaState::SoftExceeded),
            2 => Some(QuotaState::HardExceeded),
            _ => None,
        }
    }

    /// Human label of the limit that was crossed, if any.
    pub fn limit_label(self) -> Option<&'static str> {
        match self {
            QuotaState::Normal => None,
            QuotaState::SoftExceeded => Some("soft limit"),
            QuotaState::HardExceeded => Some("hard limit"),
        }
    }
}

impl fmt::Display for QuotaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuotaState::Normal => "normal",
            QuotaState::SoftExceeded => "soft_exceeded",
            QuotaState::HardExceeded => "hard_exceeded",
        };
        f.write_str(label)
    }
}

impl ToSql for QuotaState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.ordinal())))
    }
}

impl FromSql for QuotaState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let ordinal = value.as_i64()?;
        QuotaState::from_ordinal(ordinal).ok_or(FromSqlError::OutOfRange(ordinal))
    }
}
