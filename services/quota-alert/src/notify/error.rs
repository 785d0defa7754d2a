use std::io;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("failed to build message: {0}")]
    MessageBuild(String),
    #[error("smtp configuration error: {0}")]
    SmtpConfig(String),
    #[error("smtp delivery failed: {0}")]
    SmtpDelivery(String),
    #[error("failed to run local mail command {command}: {source}")]
    LocalMailSpawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("local mail command exited with {status}: {stderr}")]
    LocalMailFailed { status: ExitStatus, stderr: String },
}
