use std::{env, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};

/// Runtime configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    pub db_path: PathBuf,
    pub midpass_base_url: String,
    pub locale_path: Option<PathBuf>,
    pub reconcile_interval: Duration,
    pub stale_threshold_checks: u32,
    pub http_timeout: Duration,
    pub health_addr: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN must be set")?;

        let db_path = env::var("TRACKER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("passtrack.sqlite3"));

        let midpass_base_url = env::var("MIDPASS_BASE_URL")
            .unwrap_or_else(|_| "https://info.midpass.ru".to_string());

        let locale_path = env::var("TRACKER_LOCALE_PATH").ok().map(PathBuf::from);

        let reconcile_interval =
            Duration::from_secs(parse_env("RECONCILE_INTERVAL_SECS", 30 * 60u64)?);

        let stale_threshold_checks = parse_env("STALE_THRESHOLD_CHECKS", 48u32)?;

        let http_timeout = Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 15u64)?);

        let health_addr =
            env::var("HEALTH_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            bot_token,
            db_path,
            midpass_base_url,
            locale_path,
            reconcile_interval,
            stale_threshold_checks,
            http_timeout,
            health_addr,
        })
    }
}

/// Parse into the target integer type directly, so an out-of-range value is
/// a startup error rather than a silent truncation.
fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow!("{name} must be a positive integer in range, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
