//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use domain::{LifecycleConfig, Money, PaymentWindows, PricingPolicy};
use sweeper::SweeperConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `CATALOG_PATH`: JSON file of products and stock to seed at start-up
/// - `SWEEP_INTERVAL_SECS`, `SWEEP_BATCH_SIZE`, `SWEEP_CONCURRENCY`
/// - `FREE_SHIPPING_THRESHOLD_CENTS`, `FLAT_SHIPPING_FEE_CENTS`, `TAX_RATE_BPS`
/// - `REFERENCE_PAYMENT_WINDOW_HOURS`, `CONFIRMATION_CODE_WINDOW_HOURS`
///
/// Values that fail to parse fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub catalog_path: Option<PathBuf>,
    pub sweep_interval_secs: u64,
    pub sweep_batch_size: usize,
    pub sweep_concurrency: usize,
    pub free_shipping_threshold_cents: i64,
    pub flat_shipping_fee_cents: i64,
    pub tax_rate_bps: u32,
    pub reference_payment_window_hours: u32,
    pub confirmation_code_window_hours: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: parse_or(text("PORT"), defaults.port),
            log_level: text("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parse_or(text("LOG_FORMAT"), defaults.log_format),
            database_url: text("DATABASE_URL"),
            database_max_connections: parse_or(
                text("DATABASE_MAX_CONNECTIONS"),
                defaults.database_max_connections,
            ),
            catalog_path: text("CATALOG_PATH").map(PathBuf::from),
            sweep_interval_secs: parse_or(
                text("SWEEP_INTERVAL_SECS"),
                defaults.sweep_interval_secs,
            ),
            sweep_batch_size: parse_or(text("SWEEP_BATCH_SIZE"), defaults.sweep_batch_size),
            sweep_concurrency: parse_or(text("SWEEP_CONCURRENCY"), defaults.sweep_concurrency),
            free_shipping_threshold_cents: parse_or(
                text("FREE_SHIPPING_THRESHOLD_CENTS"),
                defaults.free_shipping_threshold_cents,
            ),
            flat_shipping_fee_cents: parse_or(
                text("FLAT_SHIPPING_FEE_CENTS"),
                defaults.flat_shipping_fee_cents,
            ),
            tax_rate_bps: parse_or(text("TAX_RATE_BPS"), defaults.tax_rate_bps),
            reference_payment_window_hours: parse_or(
                text("REFERENCE_PAYMENT_WINDOW_HOURS"),
                defaults.reference_payment_window_hours,
            ),
            confirmation_code_window_hours: parse_or(
                text("CONFIRMATION_CODE_WINDOW_HOURS"),
                defaults.confirmation_code_window_hours,
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            pricing: PricingPolicy {
                free_shipping_threshold: Money::from_cents(self.free_shipping_threshold_cents),
                flat_shipping_fee: Money::from_cents(self.flat_shipping_fee_cents),
                tax_rate_bps: self.tax_rate_bps,
            },
            payment_windows: PaymentWindows {
                third_party_reference_hours: self.reference_payment_window_hours,
                direct_transfer_hours: self.confirmation_code_window_hours,
            },
            ..LifecycleConfig::default()
        }
    }

    pub fn sweeper_config(&self) -> SweeperConfig {
        SweeperConfig {
            batch_size: self.sweep_batch_size,
            concurrency: self.sweep_concurrency,
            interval: Duration::from_secs(self.sweep_interval_secs),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        let lifecycle = LifecycleConfig::default();
        let sweeper = SweeperConfig::default();

        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 5,
            catalog_path: None,
            sweep_interval_secs: sweeper.interval.as_secs(),
            sweep_batch_size: sweeper.batch_size,
            sweep_concurrency: sweeper.concurrency,
            free_shipping_threshold_cents: lifecycle.pricing.free_shipping_threshold.cents(),
            flat_shipping_fee_cents: lifecycle.pricing.flat_shipping_fee.cents(),
            tax_rate_bps: lifecycle.pricing.tax_rate_bps,
            reference_payment_window_hours: lifecycle.payment_windows.third_party_reference_hours,
            confirmation_code_window_hours: lifecycle.payment_windows.direct_transfer_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.database_url.is_none());
        assert_eq!(config.sweep_interval_secs, 300);
        assert_eq!(config.sweep_batch_size, 100);
        assert_eq!(config.sweep_concurrency, 8);
        assert_eq!(config.free_shipping_threshold_cents, 10_000);
        assert_eq!(config.flat_shipping_fee_cents, 1_000);
        assert_eq!(config.tax_rate_bps, 800);
        assert_eq!(config.reference_payment_window_hours, 72);
        assert_eq!(config.confirmation_code_window_hours, 48);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("SWEEP_INTERVAL_SECS", "60"),
            ("TAX_RATE_BPS", "725"),
            ("CONFIRMATION_CODE_WINDOW_HOURS", "24"),
        ]);

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );

        let lifecycle = config.lifecycle_config();
        assert_eq!(lifecycle.pricing.tax_rate_bps, 725);
        assert_eq!(lifecycle.payment_windows.direct_transfer_hours, 24);
        assert_eq!(lifecycle.payment_windows.third_party_reference_hours, 72);
        assert_eq!(config.sweeper_config().interval, Duration::from_secs(60));
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config_from(&[
            ("PORT", "eighty"),
            ("SWEEP_BATCH_SIZE", ""),
            ("DATABASE_URL", " "),
        ]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.sweep_batch_size, 100);
        assert!(config.database_url.is_none());
    }
}
