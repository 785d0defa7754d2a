use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use disk_quota_alert::{
    AddressBook, AlertCoordinator, MailNotifier, QuotaAlertConfig, QuotaStore, ReportCommand,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = QuotaAlertConfig::from_env()?;
    init_tracing(&config.log_level)?;

    let db_path = config.db_path();
    info!(
        db = %db_path.display(),
        alias = %config.alias_path.display(),
        hostname = %config.hostname,
        "starting quota alert cycle"
    );

    let store = QuotaStore::open(&db_path)
        .with_context(|| format!("unable to open quota store {}", db_path.display()))?;
    let holder = format!("{}@{}", std::process::id(), config.hostname);
    let lease = store
        .acquire_lease(&holder, config.lease_ttl())
        .context("unable to start cycle")?;

    let source = ReportCommand::new(config.report_command.clone())?;
    let notifier = MailNotifier::from_config(&config)?;
    let addresses = AddressBook::load(&config.alias_path);
    let coordinator = AlertCoordinator::new(&store, notifier, addresses, config.hostname.clone());

    let summary = coordinator
        .run_from(&source)
        .await
        .context("quota alert cycle aborted")?;
    lease.release()?;

    info!(
        finished_at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        users = summary.snapshot_size,
        worklist = summary.worklist_size,
        notified = summary.notified,
        failed = summary.failed,
        reset = summary.reset,
        "quota alert cycle finished successfully"
    );
    Ok(())
}

fn init_tracing(default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).try_init().map_err(anyhow::Error::msg)?;
    Ok(())
}
