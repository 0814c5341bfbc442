//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL of this API
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook endpoint signing secret
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3001)
//! - `STOREFRONT_FRONTEND_URL` - Allowed CORS origin (default: `http://localhost:3000`)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: `https://api.stripe.com`)
//! - `STRIPE_CURRENCY` - Charge currency (default: eur)
//! - `STRIPE_WEBHOOK_TOLERANCE_SECS` - Max webhook timestamp skew (default: 300)
//! - `CHECKOUT_MAX_QUANTITY` - Max units per cart line (default: 100)
//! - `PASSWORD_MIN_LENGTH` - Minimum password length (default: 8)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use aerox_core::CurrencyCode;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "change-in-production",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Origin of the browser frontend, allowed by CORS
    pub frontend_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Stripe configuration
    pub stripe: StripeConfig,
    /// Checkout and password policy
    pub checkout: CheckoutPolicy,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Stripe API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// API base URL, overridable for tests and mocks
    pub api_base: String,
    /// Currency every intent is charged in
    pub currency: CurrencyCode,
    /// Maximum accepted age of a webhook signature timestamp, in seconds
    pub webhook_tolerance_secs: i64,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .finish()
    }
}

/// Product decisions baked into checkout validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// Largest quantity accepted on a single cart line
    pub max_quantity: u32,
    /// Password strength rules for account creation and password changes
    pub password: PasswordPolicy,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            max_quantity: 100,
            password: PasswordPolicy::default(),
        }
    }
}

/// Password strength rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_digit: bool,
    pub require_uppercase: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_digit: true,
            require_uppercase: true,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("STOREFRONT_PORT", "3001")?;
        let base_url = validate_url("STOREFRONT_BASE_URL", get_required_env("STOREFRONT_BASE_URL")?)?;
        let frontend_url = validate_url(
            "STOREFRONT_FRONTEND_URL",
            get_env_or_default("STOREFRONT_FRONTEND_URL", "http://localhost:3000"),
        )?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let stripe = StripeConfig::from_env()?;
        let checkout = CheckoutPolicy::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            frontend_url,
            session_secret,
            stripe,
            checkout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StripeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let currency = get_env_or_default("STRIPE_CURRENCY", "eur")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STRIPE_CURRENCY".to_string(), e))?;

        Ok(Self {
            secret_key: get_validated_secret("STRIPE_SECRET_KEY")?,
            webhook_secret: get_validated_secret("STRIPE_WEBHOOK_SECRET")?,
            api_base: validate_url(
                "STRIPE_API_BASE",
                get_env_or_default("STRIPE_API_BASE", "https://api.stripe.com"),
            )?,
            currency,
            webhook_tolerance_secs: get_parsed_or_default("STRIPE_WEBHOOK_TOLERANCE_SECS", "300")?,
        })
    }
}

impl CheckoutPolicy {
    fn from_env() -> Result<Self, ConfigError> {
        let max_quantity: u32 = get_parsed_or_default("CHECKOUT_MAX_QUANTITY", "100")?;
        if max_quantity == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CHECKOUT_MAX_QUANTITY".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let min_length: usize = get_parsed_or_default("PASSWORD_MIN_LENGTH", "8")?;

        Ok(Self {
            max_quantity,
            password: PasswordPolicy {
                min_length,
                ..PasswordPolicy::default()
            },
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Check that `value` is an absolute http(s) URL. The string is returned
/// unchanged so origins keep their exact form.
fn validate_url(key: &str, value: String) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme: {}", parsed.scheme()),
        ));
    }
    Ok(value)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed as `T`, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stripe_config() -> StripeConfig {
        StripeConfig {
            secret_key: SecretString::from("sk_test_51Hx9Qk2eZvKYlo2C"),
            webhook_secret: SecretString::from("whsec_9fK2mQ7xLp3Rv8Tz"),
            api_base: "https://api.stripe.com".to_string(),
            currency: CurrencyCode::EUR,
            webhook_tolerance_secs: 300,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_rejects_source_default() {
        let result = validate_secret_strength(
            "aero-x-secure-key-change-in-production",
            "STOREFRONT_SESSION_SECRET",
        );
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_stripe_style_keys() {
        assert!(validate_secret_strength("sk_test_51Hx9Qk2eZvKYlo2CaB3xY9mK", "K").is_ok());
        assert!(validate_secret_strength("whsec_9fK2mQ7xLp3Rv8TzW1nB", "K").is_ok());
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("K", "http://localhost:3000".to_string()).unwrap(),
            "http://localhost:3000"
        );
        assert!(validate_url("K", "localhost:3000/x".to_string()).is_err());
        assert!(validate_url("K", "ftp://aero-x.dev".to_string()).is_err());
        assert!(validate_url("K", "not a url".to_string()).is_err());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_checkout_policy_defaults() {
        let policy = CheckoutPolicy::default();
        assert_eq!(policy.max_quantity, 100);
        assert_eq!(policy.password.min_length, 8);
        assert!(policy.password.require_digit);
        assert!(policy.password.require_uppercase);
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "https://api.aero-x.dev".to_string(),
            frontend_url: "https://aero-x.dev".to_string(),
            session_secret: SecretString::from("x".repeat(32)),
            stripe: stripe_config(),
            checkout: CheckoutPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
        assert!(config.is_secure());
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", stripe_config());

        assert!(debug_output.contains("api.stripe.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sk_test_51Hx9Qk2eZvKYlo2C"));
        assert!(!debug_output.contains("whsec_9fK2mQ7xLp3Rv8Tz"));
    }
}
