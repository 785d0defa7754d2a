pub mod database;
pub mod error;
pub mod lease;
pub mod schema;

pub use database::QuotaStore;
pub use error::StorageError;
pub use lease::RunLease;

pub const QUOTA_DB_FILENAME: &str = "quotastat.db";
