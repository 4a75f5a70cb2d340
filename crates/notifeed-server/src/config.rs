use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use notifeed_api::RetentionRule;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Longest a single store round trip may wait on a locked database.
    pub store_timeout: Duration,
    pub retention: RetentionRule,
    pub badge_cap: usize,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = var("NOTIFEED_DB_PATH").unwrap_or_else(|| "notifeed.db".into());
        let host = var("NOTIFEED_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parsed(&var, "NOTIFEED_PORT")?.unwrap_or(3000);
        let timeout_ms: u64 = parsed(&var, "NOTIFEED_STORE_TIMEOUT_MS")?.unwrap_or(2000);
        let badge_cap = parsed(&var, "NOTIFEED_BADGE_CAP")?.unwrap_or(30);

        let max_num: Option<usize> = parsed(&var, "NOTIFEED_RETENTION_MAX_NUM")?;
        let max_age: Option<u64> = parsed(&var, "NOTIFEED_RETENTION_MAX_AGE_SECS")?;
        let retention = if max_num.is_none() && max_age.is_none() {
            RetentionRule::default()
        } else {
            RetentionRule::from_limits(max_num, max_age.map(Duration::from_secs)).context(
                "NOTIFEED_RETENTION_MAX_NUM and NOTIFEED_RETENTION_MAX_AGE_SECS are mutually exclusive",
            )?
        };

        Ok(Self {
            db_path: PathBuf::from(db_path),
            host,
            port,
            store_timeout: Duration::from_millis(timeout_ms),
            retention,
            badge_cap,
        })
    }
}

fn parsed<T, F>(var: &F, name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid {}: {:?}", name, raw))
        })
        .transpose()
}
