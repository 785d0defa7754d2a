pub mod error;
pub mod record;
pub mod report;
pub mod state;

pub use error::ReportError;
pub use record::{QuotaUsage, UserQuotaRecord};
pub use report::{parse_report, ReportCommand};
pub use state::QuotaState;

/// Usage and limits are reported in kilobytes.
pub const KB_PER_GB: f64 = 1024.0 * 1024.0;
