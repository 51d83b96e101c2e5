//! Application configuration

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Minutes in a day; the first maintenance run must fall inside the day after midnight
const MINUTES_PER_DAY: u32 = 24 * 60;

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root data folder; plot files live under `<data_dir>/plots`
    pub data_dir: PathBuf,
    /// Snapshot file of the embedded world host
    pub host_snapshot: PathBuf,

    /// Minutes after local midnight of the first maintenance run
    pub maintenance_offset_minutes: u32,
    /// Time between maintenance runs
    pub maintenance_period: Duration,

    /// Pretty-print persisted plot files
    pub pretty_json: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let data_dir = PathBuf::from(
            env::var("PLOTKEEPER_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
        );
        let host_snapshot = env::var("PLOTKEEPER_HOST_SNAPSHOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("host.json"));

        let offset = env::var("PLOTKEEPER_MAINTENANCE_OFFSET_MINUTES")
            .unwrap_or_else(|_| "1".to_string());
        let maintenance_offset_minutes = parse_offset_minutes(&offset)?;

        let period = env::var("PLOTKEEPER_MAINTENANCE_PERIOD_HOURS")
            .unwrap_or_else(|_| "24".to_string());
        let maintenance_period = parse_period_hours(&period)?;

        let pretty_json = env::var("PLOTKEEPER_PRETTY_JSON")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .context("PLOTKEEPER_PRETTY_JSON must be true or false")?;

        Ok(Self {
            data_dir,
            host_snapshot,
            maintenance_offset_minutes,
            maintenance_period,
            pretty_json,
        })
    }
}

fn parse_offset_minutes(raw: &str) -> Result<u32> {
    let minutes: u32 = raw
        .trim()
        .parse()
        .context("PLOTKEEPER_MAINTENANCE_OFFSET_MINUTES must be a whole number of minutes")?;
    if minutes >= MINUTES_PER_DAY {
        bail!(
            "PLOTKEEPER_MAINTENANCE_OFFSET_MINUTES must be less than {} (one day), got {}",
            MINUTES_PER_DAY,
            minutes
        );
    }
    Ok(minutes)
}

fn parse_period_hours(raw: &str) -> Result<Duration> {
    let hours: u32 = raw
        .trim()
        .parse()
        .context("PLOTKEEPER_MAINTENANCE_PERIOD_HOURS must be a whole number of hours")?;
    if hours == 0 {
        bail!("PLOTKEEPER_MAINTENANCE_PERIOD_HOURS must be greater than zero");
    }
    Ok(Duration::from_secs(u64::from(hours) * 3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_within_the_day_is_accepted() {
        assert_eq!(parse_offset_minutes("1").unwrap(), 1);
        assert_eq!(parse_offset_minutes(" 0 ").unwrap(), 0);
        assert_eq!(parse_offset_minutes("1439").unwrap(), 1439);
    }

    #[test]
    fn test_negative_offset_is_rejected() {
        let err = parse_offset_minutes("-120").unwrap_err();
        assert!(err.to_string().contains("PLOTKEEPER_MAINTENANCE_OFFSET_MINUTES"));
    }

    #[test]
    fn test_offset_of_a_day_or_more_is_rejected() {
        assert!(parse_offset_minutes("1440").is_err());
        assert!(parse_offset_minutes("9223372036854775807").is_err());
    }

    #[test]
    fn test_period_must_be_positive_hours() {
        assert_eq!(parse_period_hours("24").unwrap(), Duration::from_secs(24 * 3600));
        assert!(parse_period_hours("0").is_err());
        assert!(parse_period_hours("-1").is_err());
        assert!(parse_period_hours("soon").is_err());
    }
}
