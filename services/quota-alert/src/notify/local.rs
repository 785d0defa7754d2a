use std::io;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::error::NotifyError;
use super::message::AlertMessage;

/// Local delivery through a `mail`-compatible command:
/// `<program> -s <subject> <user>` with the body on stdin.
#[derive(Debug, Clone)]
pub struct LocalMailer {
    program: String,
}

impl LocalMailer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub async fn deliver(&self, user: &str, message: &AlertMessage) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.program)
            .arg("-s")
            .arg(&message.subject)
            .arg(user)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| NotifyError::LocalMailSpawn {
                command: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that exits without reading stdin is judged by its status.
            match stdin.write_all(message.body.as_bytes()).await {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(source) => {
                    return Err(NotifyError::LocalMailSpawn {
                        command: self.program.clone(),
                        source,
                    })
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| NotifyError::LocalMailSpawn {
                command: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(NotifyError::LocalMailFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(user, program = %self.program, "local mail accepted message");
        Ok(())
    }
}
