use std::io;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report command is empty")]
    EmptyCommand,
    #[error("failed to run report command {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("report command {command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("report output is not valid utf-8")]
    InvalidOutput(#[from] std::string::FromUtf8Error),
}
