use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub consumer_group: String,
}

/// Operational knobs of the reservation protocol. Every constant the
/// domain services branch on lives here rather than in code.
#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_reservation_window_minutes")]
    pub reservation_window_minutes: i64,
    #[serde(default = "default_lock_ttl_seconds")]
    pub lock_ttl_seconds: u64,
    #[serde(default = "default_max_tickets_per_booking")]
    pub max_tickets_per_booking: i32,
    #[serde(default = "default_cancellation_cutoff_hours")]
    pub cancellation_cutoff_hours: i64,
    #[serde(default = "default_single_booking_per_event")]
    pub single_booking_per_event: bool,
    #[serde(default = "default_payment_max_retries")]
    pub payment_max_retries: u32,
    #[serde(default = "default_payment_retry_backoff_seconds")]
    pub payment_retry_backoff_seconds: u64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_reservation_window_minutes() -> i64 {
    15
}

fn default_lock_ttl_seconds() -> u64 {
    30
}

fn default_max_tickets_per_booking() -> i32 {
    10
}

fn default_cancellation_cutoff_hours() -> i64 {
    24
}

fn default_single_booking_per_event() -> bool {
    true
}

fn default_payment_max_retries() -> u32 {
    3
}

fn default_payment_retry_backoff_seconds() -> u64 {
    5
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            reservation_window_minutes: default_reservation_window_minutes(),
            lock_ttl_seconds: default_lock_ttl_seconds(),
            max_tickets_per_booking: default_max_tickets_per_booking(),
            cancellation_cutoff_hours: default_cancellation_cutoff_hours(),
            single_booking_per_event: default_single_booking_per_event(),
            payment_max_retries: default_payment_max_retries(),
            payment_retry_backoff_seconds: default_payment_retry_backoff_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of TESSERA)
            // Eg.. `TESSERA__SERVER__PORT=8085` would set the server port
            .add_source(config::Environment::with_prefix("TESSERA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_rules_fill_defaults() {
        let rules: BusinessRules = serde_json::from_str("{}").unwrap();
        assert_eq!(rules.reservation_window_minutes, 15);
        assert_eq!(rules.lock_ttl_seconds, 30);
        assert_eq!(rules.max_tickets_per_booking, 10);
        assert_eq!(rules.cancellation_cutoff_hours, 24);
        assert!(rules.single_booking_per_event);
        assert_eq!(rules.payment_max_retries, 3);
        assert_eq!(rules.payment_retry_backoff_seconds, 5);
        assert_eq!(rules.sweep_interval_seconds, 60);
    }

    #[test]
    fn test_business_rules_respect_overrides() {
        let rules: BusinessRules =
            serde_json::from_str(r#"{"lock_ttl_seconds": 10, "single_booking_per_event": false}"#)
                .unwrap();
        assert_eq!(rules.lock_ttl_seconds, 10);
        assert!(!rules.single_booking_per_event);
        assert_eq!(rules.payment_max_retries, 3);
    }
}
