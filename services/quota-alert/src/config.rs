use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::storage::QUOTA_DB_FILENAME;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub tls: bool,
}

#[derive(Debug, Clone)]
pub struct QuotaAlertConfig {
    pub data_dir: PathBuf,
    pub db_filename: String,
    pub alias_path: PathBuf,
    pub report_command: Vec<String>,
    pub hostname: String,
    pub local_mail_command: String,
    pub smtp: Option<SmtpConfig>,
    pub lease_ttl_secs: u64,
    pub log_level: String,
}

impl Default for QuotaAlertConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/quota-alert"),
            db_filename: QUOTA_DB_FILENAME.to_string(),
            alias_path: PathBuf::from("alias"),
            report_command: split_command("/usr/sbin/repquota -a"),
            hostname: system_hostname(),
            local_mail_command: "mail".to_string(),
            smtp: None,
            lease_ttl_secs: 3600,
            log_level: "info".to_string(),
        }
    }
}

impl QuotaAlertConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(dir) = env::var("QUOTA_ALERT_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(name) = env::var("QUOTA_ALERT_DB_FILE") {
            cfg.db_filename = name;
        }
        if let Ok(path) = env::var("QUOTA_ALERT_ALIAS_FILE") {
            cfg.alias_path = PathBuf::from(path);
        }
        if let Ok(command) = env::var("QUOTA_ALERT_REPORT_CMD") {
            cfg.report_command = split_command(&command);
        }
        if let Ok(hostname) = env::var("QUOTA_ALERT_HOSTNAME") {
            cfg.hostname = hostname;
        }
        if let Ok(command) = env::var("QUOTA_ALERT_LOCAL_MAIL_CMD") {
            cfg.local_mail_command = command;
        }
        if let Ok(ttl) = env::var("QUOTA_ALERT_LEASE_TTL_SECS") {
            cfg.lease_ttl_secs = ttl
                .parse()
                .context("QUOTA_ALERT_LEASE_TTL_SECS must be a positive integer")?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }
        cfg.smtp = smtp_from_env()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_directory(&self.data_dir)?;

        if self.db_filename.trim().is_empty() {
            anyhow::bail!("QUOTA_ALERT_DB_FILE must not be empty");
        }
        if self.report_command.is_empty() {
            anyhow::bail!("QUOTA_ALERT_REPORT_CMD must not be empty");
        }
        if self.local_mail_command.trim().is_empty() {
            anyhow::bail!("QUOTA_ALERT_LOCAL_MAIL_CMD must not be empty");
        }
        if self.lease_ttl_secs == 0 {
            anyhow::bail!("QUOTA_ALERT_LEASE_TTL_SECS must be greater than zero");
        }

        if let Some(smtp) = &self.smtp {
            if smtp.host.trim().is_empty() {
                anyhow::bail!("SMTP_HOST must not be empty");
            }
            if smtp.from_address.trim().is_empty() {
                anyhow::bail!("SMTP_FROM is required when SMTP_HOST is set");
            }
            if smtp.username.is_some() != smtp.password.is_some() {
                anyhow::bail!("SMTP_USERNAME and SMTP_PASSWORD must be set together");
            }
        }

        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_filename)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }
}

fn smtp_from_env() -> Result<Option<SmtpConfig>> {
    let Ok(host) = env::var("SMTP_HOST") else {
        return Ok(None);
    };

    let port = match env::var("SMTP_PORT") {
        Ok(port) => port.parse().context("SMTP_PORT must be a valid u16")?,
        Err(_) => 465,
    };
    let tls = match env::var("SMTP_TLS") {
        Ok(flag) => parse_bool(&flag).with_context(|| format!("SMTP_TLS is invalid: {flag}"))?,
        Err(_) => true,
    };

    Ok(Some(SmtpConfig {
        host,
        port,
        username: env::var("SMTP_USERNAME").ok(),
        password: env::var("SMTP_PASSWORD").ok(),
        from_address: env::var("SMTP_FROM").unwrap_or_default(),
        tls,
    }))
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}

fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

fn system_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => anyhow::bail!("invalid boolean value {value}"),
    }
}
