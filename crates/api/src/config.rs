//! # API Configuration Module
//!
//! Loads server settings and the scheduling policy from environment variables.
//!
//! ## Environment Variables
//!
//! - `API_HOST`: The host address to bind the server to (default: "0.0.0.0")
//! - `API_PORT`: The port to listen on (default: 3000)
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `API_CORS_ORIGINS`: Comma-separated list of allowed CORS origins
//! - `API_REQUEST_TIMEOUT_SECONDS`: Per-request timeout (default: 30)
//!
//! Scheduling policy overrides, all optional:
//!
//! - `BUSINESS_TIMEZONE` (default: "Asia/Tokyo")
//! - `REBOOK_WINDOW_DAYS`, `FREE_TRIAL_REBOOK_WINDOW_DAYS`
//! - `REBOOK_LEAD_HOURS`, `FREE_TRIAL_REBOOK_LEAD_HOURS`
//! - `RECURRING_EDIT_LEAD_DAYS`, `GENERATION_HORIZON_WEEKS`
//! - `BUSINESS_EARLIEST_START`, `BUSINESS_LATEST_START` as `HH:MM`
//! - `BUSINESS_DISABLED_SLOTS`: comma-separated `weekday@HH:MM` pairs, 0 = Sunday

use chrono::Duration;
use chrono_tz::Tz;
use classbook_core::models::schedule::SlotTime;
use classbook_core::policy::SchedulingPolicy;
use eyre::{eyre, Result, WrapErr};
use std::env;
use tracing::Level;

/// Configuration for the Classbook API server
///
/// # Example
///
/// ```no_run
/// use eyre::Result;
/// use classbook_api::config::ApiConfig;
///
/// fn example() -> Result<()> {
///     let config = ApiConfig::from_env()?;
///     println!("Starting server on {}", config.server_addr());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host address for the API server (e.g., "127.0.0.1", "0.0.0.0")
    pub host: String,

    /// Port for the API server to listen on
    pub port: u16,

    /// PostgreSQL database connection string
    pub database_url: String,

    pub log_level: Level,

    /// CORS allowed origins (optional)
    pub cors_origins: Option<Vec<String>>,

    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Business constants handed to the scheduling service
    pub policy: SchedulingPolicy,
}

impl ApiConfig {
    /// Creates a new ApiConfig from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or any set value fails to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Network settings
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("API_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .wrap_err("Invalid API_PORT value")?;

        // Database settings
        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| eyre!("DATABASE_URL environment variable must be set"))?;

        // Logging settings
        let log_level = match lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        // CORS settings
        let cors_origins = lookup("API_CORS_ORIGINS")
            .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect());

        // Performance settings
        let request_timeout = lookup("API_REQUEST_TIMEOUT_SECONDS")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(30);

        let policy = policy_from_lookup(&lookup)?;

        Ok(Self {
            host,
            port,
            database_url,
            log_level,
            cors_origins,
            request_timeout,
            policy,
        })
    }

    /// Returns the server address as a string (e.g., "127.0.0.1:8080")
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn policy_from_lookup<F>(lookup: &F) -> Result<SchedulingPolicy>
where
    F: Fn(&str) -> Option<String>,
{
    let mut policy = SchedulingPolicy::default();

    if let Some(raw) = lookup("BUSINESS_TIMEZONE") {
        policy.timezone = raw
            .parse::<Tz>()
            .map_err(|e| eyre!("Invalid BUSINESS_TIMEZONE value {raw}: {e}"))?;
    }

    let number = |key: &str| -> Result<Option<i64>> {
        lookup(key)
            .map(|raw| raw.parse::<i64>().wrap_err_with(|| format!("Invalid {key} value")))
            .transpose()
    };

    if let Some(days) = number("REBOOK_WINDOW_DAYS")? {
        policy.rebook_window = Duration::days(days);
    }
    if let Some(days) = number("FREE_TRIAL_REBOOK_WINDOW_DAYS")? {
        policy.free_trial_rebook_window = Duration::days(days);
    }
    if let Some(hours) = number("REBOOK_LEAD_HOURS")? {
        policy.rebook_lead = Duration::hours(hours);
    }
    if let Some(hours) = number("FREE_TRIAL_REBOOK_LEAD_HOURS")? {
        policy.free_trial_rebook_lead = Duration::hours(hours);
    }
    if let Some(days) = number("RECURRING_EDIT_LEAD_DAYS")? {
        policy.recurring_edit_lead = Duration::days(days);
    }
    if let Some(weeks) = number("GENERATION_HORIZON_WEEKS")? {
        policy.generation_horizon = Duration::weeks(weeks);
    }

    if let Some(raw) = lookup("BUSINESS_EARLIEST_START") {
        policy.business_hours.earliest_start = parse_time("BUSINESS_EARLIEST_START", &raw)?;
    }
    if let Some(raw) = lookup("BUSINESS_LATEST_START") {
        policy.business_hours.latest_start = parse_time("BUSINESS_LATEST_START", &raw)?;
    }
    if let Some(raw) = lookup("BUSINESS_DISABLED_SLOTS") {
        policy.business_hours.disabled = parse_disabled_slots(&raw)?;
    }

    Ok(policy)
}

fn parse_time(key: &str, raw: &str) -> Result<SlotTime> {
    raw.trim().parse().map_err(|e| eyre!("Invalid {key} value: {e}"))
}

/// Parses `weekday@HH:MM` pairs such as `0@09:00,3@18:30`.
pub fn parse_disabled_slots(raw: &str) -> Result<Vec<(u8, SlotTime)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (day, time) = entry
                .split_once('@')
                .ok_or_else(|| eyre!("Invalid disabled slot {entry} (expected weekday@HH:MM)"))?;
            let day: u8 = day
                .parse()
                .ok()
                .filter(|d| *d <= 6)
                .ok_or_else(|| eyre!("Invalid weekday in disabled slot {entry}"))?;
            Ok((day, parse_time("BUSINESS_DISABLED_SLOTS", time)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_database_url_is_set() {
        let config = ApiConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/classbook")])).unwrap();

        assert_eq!(config.server_addr(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.request_timeout, 30);
        assert!(config.cors_origins.is_none());
        assert_eq!(config.policy.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(config.policy.rebook_window, Duration::days(180));
        assert_eq!(config.policy.generation_horizon, Duration::weeks(12));
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        let err = ApiConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_policy_overrides_are_read() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/classbook"),
            ("API_CORS_ORIGINS", "http://a.test, http://b.test"),
            ("BUSINESS_TIMEZONE", "Europe/London"),
            ("REBOOK_LEAD_HOURS", "5"),
            ("GENERATION_HORIZON_WEEKS", "4"),
            ("BUSINESS_DISABLED_SLOTS", "0@09:00, 3@18:30"),
        ]))
        .unwrap();

        assert_eq!(
            config.cors_origins,
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
        assert_eq!(config.policy.timezone, chrono_tz::Europe::London);
        assert_eq!(config.policy.rebook_lead, Duration::hours(5));
        assert_eq!(config.policy.generation_horizon, Duration::weeks(4));
        assert_eq!(
            config.policy.business_hours.disabled,
            vec![(0, "09:00".parse().unwrap()), (3, "18:30".parse().unwrap())]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let base = ("DATABASE_URL", "postgres://localhost/classbook");
        assert!(ApiConfig::from_lookup(lookup_from(&[base, ("BUSINESS_TIMEZONE", "Mars/Olympus")])).is_err());
        assert!(ApiConfig::from_lookup(lookup_from(&[base, ("REBOOK_WINDOW_DAYS", "soon")])).is_err());
        assert!(parse_disabled_slots("7@10:00").is_err());
        assert!(parse_disabled_slots("1-10:00").is_err());
    }
}
