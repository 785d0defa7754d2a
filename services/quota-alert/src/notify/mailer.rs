use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::QuotaAlertConfig;

use super::error::NotifyError;
use super::local::LocalMailer;
use super::message::AlertMessage;
use super::smtp::SmtpMailer;
use super::Notifier;

/// Routes users with a known address through SMTP and everyone else
/// through local mail.
pub struct MailNotifier {
    smtp: Option<SmtpMailer>,
    local: LocalMailer,
}

impl MailNotifier {
    pub fn new(smtp: Option<SmtpMailer>, local: LocalMailer) -> Self {
        Self { smtp, local }
    }

    pub fn from_config(config: &QuotaAlertConfig) -> Result<Self, NotifyError> {
        let smtp = config.smtp.as_ref().map(SmtpMailer::new).transpose()?;
        if smtp.is_none() {
            info!("smtp not configured, all alerts use local mail");
        }
        Ok(Self::new(smtp, LocalMailer::new(&config.local_mail_command)))
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn send(
        &self,
        user: &str,
        address: Option<&str>,
        message: &AlertMessage,
    ) -> Result<(), NotifyError> {
        match (address, &self.smtp) {
            (Some(address), Some(smtp)) => {
                smtp.deliver(address, message).await?;
                info!(user, to = address, "alert mailed");
            }
            (Some(address), None) => {
                debug!(user, to = address, "address known but smtp disabled");
                self.local.deliver(user, message).await?;
                info!(user, "alert delivered to local mailbox");
            }
            (None, _) => {
                self.local.deliver(user, message).await?;
                info!(user, "alert delivered to local mailbox");
            }
        }
        Ok(())
    }
}
