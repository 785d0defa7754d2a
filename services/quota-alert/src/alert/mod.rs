pub mod coordinator;
pub mod error;

pub use coordinator::{AlertCoordinator, CycleSummary};
pub use error::AlertError;
