//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BACKEND_URL` - Base URL of the job-board backend
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `ADMIN_BACKEND_SERVICE_ID` - Service identifier shown in stopped-service
//!   messages (default: backend)
//! - `ADMIN_BACKEND_TIMEOUT_SECS` - Backend request timeout (default: 10)
//! - `ADMIN_BACKEND_TOKEN` - Identity token used by `jc-cli check-access`
//! - `ADMIN_ACCESS_MODEL` - `identity` (default) or `password`
//! - `ADMIN_ERROR_RULES_PATH` - YAML file replacing the error classification rules
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Password model
//! - `ADMIN_PANEL_PASSWORD` - Shared admin password (min 12 chars, high entropy).
//!   Required when `ADMIN_ACCESS_MODEL=password`, ignored otherwise.
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::services::{AccessModel, ErrorClassifier, RuleError};

const MIN_PANEL_PASSWORD_LENGTH: usize = 12;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_SERVICE_ID: &str = "backend";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
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
    #[error("Invalid error rules: {0}")]
    Rules(#[from] RuleError),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin panel
    pub base_url: String,
    /// Job-board backend connection
    pub backend: BackendConfig,
    /// How the admin panel is unlocked
    pub access_model: AccessModel,
    /// Replacement error classification rules
    pub error_rules_path: Option<PathBuf>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Job-board backend connection.
///
/// Implements `Debug` manually to redact the identity token.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, always ending in `/`
    pub url: Url,
    /// Identifier named in stopped-service messages
    pub service_id: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Identity token for operator tooling
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("service_id", &self.service_id)
            .field("timeout", &self.timeout)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Source of configuration values.
trait Env {
    fn get(&self, key: &str) -> Option<String>;
}

struct ProcessEnv;

impl Env for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl Env for HashMap<&str, &str> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key)
            .filter(|v| !v.is_empty())
            .map(|v| (*v).to_owned())
    }
}

impl TlsConfig {
    fn load(env: &impl Env) -> Result<Option<Self>, ConfigError> {
        let cert_pem = env.get("ADMIN_TLS_CERT");
        let key_pem = env.get("ADMIN_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl BackendConfig {
    fn load(env: &impl Env) -> Result<Self, ConfigError> {
        let raw = get_required(env, "ADMIN_BACKEND_URL")?;
        let url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_BACKEND_URL".to_string(), e))?;

        let timeout_secs = get_or_default(
            env,
            "ADMIN_BACKEND_TIMEOUT_SECS",
            &DEFAULT_BACKEND_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("ADMIN_BACKEND_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        Ok(Self {
            url,
            service_id: get_or_default(env, "ADMIN_BACKEND_SERVICE_ID", DEFAULT_SERVICE_ID),
            timeout: Duration::from_secs(timeout_secs),
            token: env.get("ADMIN_BACKEND_TOKEN").map(SecretString::from),
        })
    }
}

fn load_access_model(env: &impl Env) -> Result<AccessModel, ConfigError> {
    let password = env.get("ADMIN_PANEL_PASSWORD");
    match get_or_default(env, "ADMIN_ACCESS_MODEL", "identity").as_str() {
        "identity" => {
            if password.is_some() {
                tracing::warn!("ADMIN_PANEL_PASSWORD is ignored with the identity access model");
            }
            Ok(AccessModel::Identity)
        }
        "password" => {
            let password =
                password.ok_or_else(|| ConfigError::MissingEnvVar("ADMIN_PANEL_PASSWORD".into()))?;
            validate_panel_password(&password, "ADMIN_PANEL_PASSWORD")?;
            Ok(AccessModel::Password(SecretString::from(password)))
        }
        other => Err(ConfigError::InvalidEnvVar(
            "ADMIN_ACCESS_MODEL".to_string(),
            format!("expected 'identity' or 'password', got '{other}'"),
        )),
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the panel password fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::load(&ProcessEnv)
    }

    fn load(env: &impl Env) -> Result<Self, ConfigError> {
        let host = get_or_default(env, "ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_or_default(env, "ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;
        let base_url = env
            .get("ADMIN_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));

        let backend = BackendConfig::load(env)?;
        let access_model = load_access_model(env)?;
        let error_rules_path = env.get("ADMIN_ERROR_RULES_PATH").map(PathBuf::from);

        let sentry_dsn = env.get("SENTRY_DSN");
        let sentry_environment = env.get("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .get("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .get("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::load(env)?;

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            access_model,
            error_rules_path,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Build the error classifier: the YAML table at `ADMIN_ERROR_RULES_PATH`
    /// if set, the built-in table otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Rules` if the rule file is unreadable or invalid.
    pub fn classifier(&self) -> Result<ErrorClassifier, ConfigError> {
        let service_id = &self.backend.service_id;
        match &self.error_rules_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading error classification rules");
                Ok(ErrorClassifier::from_yaml_file(path, service_id)?)
            }
            None => Ok(ErrorClassifier::with_defaults(service_id)),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required value.
fn get_required(env: &impl Env, key: &str) -> Result<String, ConfigError> {
    env.get(key)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a value with a default.
fn get_or_default(env: &impl Env, key: &str, default: &str) -> String {
    env.get(key).unwrap_or_else(|| default.to_string())
}

/// Parse a base URL, making sure relative joins land under it.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Validate the shared admin password: long enough, not a placeholder,
/// high entropy.
fn validate_panel_password(password: &str, var_name: &str) -> Result<(), ConfigError> {
    if password.chars().count() < MIN_PANEL_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_PANEL_PASSWORD_LENGTH} characters"),
        ));
    }
    validate_secret_strength(password, var_name)
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
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
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
