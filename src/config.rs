use std::env;
use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

use crate::application::timeout_sweep::SweepSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a positive number, got '{value}'")]
    Invalid { name: &'static str, value: String },
    #[error("CONFIRM_REMINDER_MINUTES ({reminder}) must not be shorter than PAYMENT_TIMEOUT_MINUTES ({timeout})")]
    ReminderBeforeTimeout { reminder: i64, timeout: i64 },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_pool_size: u32,
    pub sweep: SweepSettings,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_positive(&lookup, "PORT", 8080)?;
        let db_pool_size: u32 = parse_positive(&lookup, "DB_POOL_SIZE", 10)?;
        let timeout: i64 = parse_positive(&lookup, "PAYMENT_TIMEOUT_MINUTES", 15)?;
        let reminder: i64 = parse_positive(&lookup, "CONFIRM_REMINDER_MINUTES", 60)?;
        let interval: u64 = parse_positive(&lookup, "SWEEP_INTERVAL_SECS", 60)?;

        if reminder < timeout {
            return Err(ConfigError::ReminderBeforeTimeout { reminder, timeout });
        }

        Ok(AppConfig {
            database_url,
            host,
            port,
            db_pool_size,
            sweep: SweepSettings {
                payment_timeout: Duration::minutes(timeout),
                confirm_reminder_after: Duration::minutes(reminder),
                interval: StdDuration::from_secs(interval),
            },
        })
    }
}

fn parse_positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) if parsed > T::default() => Ok(parsed),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/orders")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_pool_size, 10);
        assert_eq!(config.sweep.payment_timeout, Duration::minutes(15));
        assert_eq!(config.sweep.confirm_reminder_after, Duration::minutes(60));
        assert_eq!(config.sweep.interval, StdDuration::from_secs(60));
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn non_numeric_and_zero_values_are_rejected() {
        let err = load(&[("DATABASE_URL", "x"), ("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));

        let err = load(&[("DATABASE_URL", "x"), ("SWEEP_INTERVAL_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SWEEP_INTERVAL_SECS", .. }));
    }

    #[test]
    fn reminder_must_not_precede_payment_timeout() {
        let err = load(&[
            ("DATABASE_URL", "x"),
            ("PAYMENT_TIMEOUT_MINUTES", "30"),
            ("CONFIRM_REMINDER_MINUTES", "10"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ReminderBeforeTimeout {
                reminder: 10,
                timeout: 30
            }
        ));
    }
}
