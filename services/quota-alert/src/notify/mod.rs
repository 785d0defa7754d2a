pub mod address;
pub mod error;
pub mod local;
pub mod mailer;
pub mod message;
pub mod smtp;

use async_trait::async_trait;

pub use address::AddressBook;
pub use error::NotifyError;
pub use local::LocalMailer;
pub use mailer::MailNotifier;
pub use message::AlertMessage;
pub use smtp::SmtpMailer;

/// Delivers an alert to one user. `address` is the resolved network mail
/// address, or `None` when the user has to be reached through local mail.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        user: &str,
        address: Option<&str>,
        message: &AlertMessage,
    ) -> Result<(), NotifyError>;
}
