use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use super::error::ReportError;
use super::record::QuotaUsage;

/// Minimum whitespace-separated fields of a `repquota` user line:
/// user, flags, block used/soft/hard, inode used/soft/hard.
const MIN_REPORT_FIELDS: usize = 8;

/// Parses `repquota` output into per-user usage. Headers, separators and any
/// line that does not carry numeric block figures are skipped, as are users
/// with no limits configured.
pub fn parse_report(output: &str) -> Vec<QuotaUsage> {
    output
        .lines()
        .filter_map(parse_line)
        .filter(QuotaUsage::has_limits)
        .collect()
}

fn parse_line(line: &str) -> Option<QuotaUsage> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_REPORT_FIELDS {
        return None;
    }

    let used = fields[2].parse().ok()?;
    let soft_limit = fields[3].parse().ok()?;
    let hard_limit = fields[4].parse().ok()?;

    Some(QuotaUsage::new(fields[0], used, soft_limit, hard_limit))
}

/// External command producing the quota report, `repquota -a` by default.
#[derive(Debug, Clone)]
pub struct ReportCommand {
    argv: Vec<String>,
}

impl ReportCommand {
    pub fn new(argv: Vec<String>) -> Result<Self, ReportError> {
        if argv.is_empty() {
            return Err(ReportError::EmptyCommand);
        }
        Ok(Self { argv })
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }

    pub async fn collect(&self) -> Result<Vec<QuotaUsage>, ReportError> {
        let command = self.command_line();
        debug!(command = %command, "running quota report command");

        let output = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ReportError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ReportError::CommandFailed {
                command,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout)?;
        let snapshot = parse_report(&stdout);
        info!(users = snapshot.len(), "collected quota report");
        Ok(snapshot)
    }
}
