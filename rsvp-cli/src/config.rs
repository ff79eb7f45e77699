use std::{env, fmt::Display, num::NonZeroU64, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use rsvp::{FileStorage, refresher::DEFAULT_POLL_INTERVAL, store::DEFAULT_STORAGE_KEY};

pub struct Config {
    endpoint: Option<String>,
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub contact: Option<String>,
}

impl Config {
    /// Read settings from the environment (after `.env` has been loaded). Flags win over env vars.
    pub fn load(endpoint: Option<String>, data_dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            endpoint: endpoint.or_else(|| var("RSVP_ENDPOINT")),
            data_dir: match data_dir {
                Some(dir) => dir,
                None => try_load("RSVP_DATA_DIR", ".")?,
            },
            storage_key: try_load("RSVP_STORAGE_KEY", DEFAULT_STORAGE_KEY)?,
            poll_interval: poll_interval(try_load(
                "RSVP_POLL_SECS",
                &DEFAULT_POLL_INTERVAL.as_secs().to_string(),
            )?),
            http_timeout: Duration::from_secs(try_load("RSVP_HTTP_TIMEOUT_SECS", "15")?),
            contact: var("RSVP_CONTACT"),
        })
    }

    pub fn endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| anyhow!("No aggregator endpoint: set RSVP_ENDPOINT or pass --endpoint"))
    }

    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.data_dir, &self.storage_key)
    }
}

pub fn poll_interval(secs: NonZeroU64) -> Duration {
    Duration::from_secs(secs.get())
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        log::debug!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value `{raw}`"))
}

