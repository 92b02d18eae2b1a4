//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPFRONT_BACKEND_URL` - Base URL of the shop backend (e.g., <https://api.example.com>)
//!
//! ## Optional
//! - `SHOPFRONT_CURRENCY` - Currency symbol shown with prices (default: `$`)
//! - `SHOPFRONT_DELIVERY_FEE` - Flat delivery fee added at checkout (default: 10)
//! - `SHOPFRONT_REQUEST_TIMEOUT_SECS` - HTTP request timeout (default: 30)
//! - `SHOPFRONT_CATALOG_TTL_SECS` - Product list cache lifetime (default: 300)
//! - `SHOPFRONT_TOKEN_PATH` - File the auth token is persisted to between runs
//! - `SHOPFRONT_SYNC_FAILURE_POLICY` - `keep` or `reconcile` (default: `keep`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate, 0.0-1.0 (default: 1.0)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shopfront_core::Price;
use thiserror::Error;
use url::Url;

const DEFAULT_CURRENCY: &str = "$";
const DEFAULT_DELIVERY_FEE: &str = "10";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// What to do with the local cart when a remote cart write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncFailurePolicy {
    /// Keep the optimistic local value and mark the cart stale.
    #[default]
    KeepOptimistic,
    /// Immediately refetch the server cart, discarding the optimistic value.
    Reconcile,
}

impl FromStr for SyncFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_optimistic" => Ok(Self::KeepOptimistic),
            "reconcile" => Ok(Self::Reconcile),
            other => Err(format!("expected `keep` or `reconcile`, got `{other}`")),
        }
    }
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Base URL of the shop backend, without a trailing slash
    pub backend_url: String,
    /// Currency symbol used when formatting prices
    pub currency: String,
    /// Flat delivery fee charged on non-empty carts
    pub delivery_fee: Price,
    /// Timeout applied to every backend request
    pub request_timeout: Duration,
    /// How long the product list stays cached
    pub catalog_ttl: Duration,
    /// File used to persist the auth token, if any
    pub token_path: Option<PathBuf>,
    /// Reaction to failed remote cart writes
    pub sync_failure_policy: SyncFailurePolicy,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
}

impl StorefrontConfig {
    /// Configuration for `backend_url` with every optional setting at its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `backend_url` is not an absolute http(s) URL.
    pub fn new(backend_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            backend_url: normalize_backend_url("SHOPFRONT_BACKEND_URL", backend_url)?,
            currency: DEFAULT_CURRENCY.to_string(),
            delivery_fee: Price::parse(DEFAULT_DELIVERY_FEE).unwrap_or(Price::ZERO),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            catalog_ttl: Duration::from_secs(DEFAULT_CATALOG_TTL_SECS),
            token_path: None,
            sync_failure_policy: SyncFailurePolicy::default(),
            sentry: SentryConfig {
                sample_rate: 1.0,
                ..SentryConfig::default()
            },
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(lookup);

        let backend_url = vars.required("SHOPFRONT_BACKEND_URL")?;
        let mut config = Self::new(&backend_url)?;

        if let Some(currency) = vars.optional("SHOPFRONT_CURRENCY") {
            config.currency = currency;
        }
        if let Some(fee) = vars.optional("SHOPFRONT_DELIVERY_FEE") {
            config.delivery_fee = Price::parse(&fee).map_err(|e| {
                ConfigError::InvalidEnvVar("SHOPFRONT_DELIVERY_FEE".to_string(), e.to_string())
            })?;
        }
        if let Some(secs) = vars.parsed::<u64>("SHOPFRONT_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = vars.parsed::<u64>("SHOPFRONT_CATALOG_TTL_SECS")? {
            config.catalog_ttl = Duration::from_secs(secs);
        }
        config.token_path = vars.optional("SHOPFRONT_TOKEN_PATH").map(PathBuf::from);
        if let Some(policy) = vars.parsed::<SyncFailurePolicy>("SHOPFRONT_SYNC_FAILURE_POLICY")? {
            config.sync_failure_policy = policy;
        }

        config.sentry.dsn = vars.optional("SENTRY_DSN");
        config.sentry.environment = vars.optional("SENTRY_ENVIRONMENT");
        if let Some(rate) = vars.parsed::<f32>("SENTRY_SAMPLE_RATE")? {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::InvalidEnvVar(
                    "SENTRY_SAMPLE_RATE".to_string(),
                    format!("must be between 0.0 and 1.0 (got {rate})"),
                ));
            }
            config.sentry.sample_rate = rate;
        }

        Ok(config)
    }

    /// Absolute URL of a backend API path such as `/api/cart/get`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.backend_url, path.trim_start_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get and parse an optional variable.
    fn parsed<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }
}

/// Validate the backend URL and strip any trailing slash.
fn normalize_backend_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "URL must have a host".to_string(),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("SHOPFRONT_BACKEND_URL", "http://localhost:4000/")]).unwrap();
        assert_eq!(config.backend_url, "http://localhost:4000");
        assert_eq!(config.currency, "$");
        assert_eq!(config.delivery_fee.amount(), Decimal::from(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_ttl, Duration::from_secs(300));
        assert!(config.token_path.is_none());
        assert_eq!(config.sync_failure_policy, SyncFailurePolicy::KeepOptimistic);
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_missing_backend_url() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SHOPFRONT_BACKEND_URL"));
    }

    #[test]
    fn test_invalid_backend_url() {
        assert!(load(&[("SHOPFRONT_BACKEND_URL", "not a url")]).is_err());
        assert!(load(&[("SHOPFRONT_BACKEND_URL", "ftp://files.example.com")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SHOPFRONT_BACKEND_URL", "https://api.example.com/shop"),
            ("SHOPFRONT_CURRENCY", "€"),
            ("SHOPFRONT_DELIVERY_FEE", "4.50"),
            ("SHOPFRONT_REQUEST_TIMEOUT_SECS", "5"),
            ("SHOPFRONT_CATALOG_TTL_SECS", "0"),
            ("SHOPFRONT_TOKEN_PATH", "/tmp/shopfront-token"),
            ("SHOPFRONT_SYNC_FAILURE_POLICY", "Reconcile"),
            ("SENTRY_SAMPLE_RATE", "0.25"),
        ])
        .unwrap();

        assert_eq!(config.currency, "€");
        assert_eq!(config.delivery_fee.amount(), Decimal::new(450, 2));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.catalog_ttl, Duration::ZERO);
        assert_eq!(config.token_path, Some(PathBuf::from("/tmp/shopfront-token")));
        assert_eq!(config.sync_failure_policy, SyncFailurePolicy::Reconcile);
        assert!((config.sentry.sample_rate - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_values() {
        let base = ("SHOPFRONT_BACKEND_URL", "http://localhost:4000");
        assert!(load(&[base, ("SHOPFRONT_DELIVERY_FEE", "-1")]).is_err());
        assert!(load(&[base, ("SHOPFRONT_REQUEST_TIMEOUT_SECS", "soon")]).is_err());
        assert!(load(&[base, ("SHOPFRONT_SYNC_FAILURE_POLICY", "rollback")]).is_err());
        assert!(load(&[base, ("SENTRY_SAMPLE_RATE", "2")]).is_err());
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let config = StorefrontConfig::new("https://api.example.com/shop/").unwrap();
        assert_eq!(
            config.endpoint("/api/cart/get"),
            "https://api.example.com/shop/api/cart/get"
        );
        assert_eq!(
            config.endpoint("api/product/list"),
            "https://api.example.com/shop/api/product/list"
        );
    }
}
