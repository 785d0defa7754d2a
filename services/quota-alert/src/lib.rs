pub mod alert;
pub mod config;
pub mod notify;
pub mod quota;
pub mod storage;

pub use alert::{AlertCoordinator, AlertError, CycleSummary};
pub use config::{QuotaAlertConfig, SmtpConfig};
pub use notify::{AddressBook, AlertMessage, MailNotifier, Notifier, NotifyError};
pub use quota::{parse_report, QuotaState, QuotaUsage, ReportCommand, ReportError, UserQuotaRecord};
pub use storage::{QuotaStore, RunLease, StorageError};
