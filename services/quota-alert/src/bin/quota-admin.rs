use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use disk_quota_alert::{QuotaAlertConfig, QuotaStore};

const USAGE: &str = "usage: quota-admin <list|truncate>";

fn main() -> Result<()> {
    let config = QuotaAlertConfig::from_env()?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(anyhow::Error::msg)?;

    let db_path = config.db_path();
    let store = QuotaStore::open(&db_path)
        .with_context(|| format!("unable to open quota store {}", db_path.display()))?;

    match std::env::args().nth(1).as_deref() {
        Some("list") => {
            for record in store.query_all()? {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        Some("truncate") => {
            let holder = format!("admin-{}", std::process::id());
            let lease = store
                .acquire_lease(&holder, config.lease_ttl())
                .context("refusing to truncate while a cycle is running")?;
            let removed = store.truncate()?;
            lease.release()?;
            info!(removed, db = %db_path.display(), "quota store truncated");
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
