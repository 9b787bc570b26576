use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_UPLOAD_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Application configuration. Everything the process needs is deserialized
/// into this struct at startup and injected explicitly from `main`; there is
/// no process-wide configuration state.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1024, max = 65535))]
    pub port: u16,

    /// Application environment ("development", "production", ...)
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// JWT signing secret for admin tokens (minimum 32 characters)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,

    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// Payment gateway API base URL
    #[serde(default = "default_gateway_url")]
    pub payment_gateway_url: String,

    /// Payment gateway key id (basic-auth user)
    #[serde(default)]
    pub payment_gateway_key_id: String,

    /// Payment gateway key secret; also the shared secret for callback
    /// signature verification
    #[serde(default)]
    pub payment_gateway_key_secret: String,

    /// Single configured currency code submitted with payment intents
    #[serde(default = "default_currency")]
    pub payment_currency: String,

    /// Timeout for gateway calls, in seconds
    #[serde(default = "default_gateway_timeout_secs")]
    pub payment_gateway_timeout_secs: u64,

    /// Directory where uploaded practical files are stored
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Upload size ceiling in bytes
    #[serde(default = "default_upload_max_bytes")]
    pub upload_max_bytes: u64,

    /// Optional webhook URL notified of new orders (best-effort)
    #[serde(default)]
    pub notification_webhook_url: Option<String>,

    /// Comma-separated list of allowed CORS origins; permissive in
    /// development when unset
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_jwt_expiration() -> u64 {
    86_400
}
fn default_auth_issuer() -> String {
    "printhub-api".to_string()
}
fn default_auth_audience() -> String {
    "printhub-admin".to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_gateway_url() -> String {
    "https://api.razorpay.com".to_string()
}
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}
fn default_gateway_timeout_secs() -> u64 {
    10
}
fn default_upload_dir() -> String {
    DEFAULT_UPLOAD_DIR.to_string()
}
fn default_upload_max_bytes() -> u64 {
    DEFAULT_UPLOAD_MAX_BYTES
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    /// Constructs a configuration with library defaults for everything not
    /// passed in. Primarily used by the test harness.
    pub fn new(
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            jwt_secret: jwt_secret.into(),
            jwt_expiration: default_jwt_expiration(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            payment_gateway_url: default_gateway_url(),
            payment_gateway_key_id: String::new(),
            payment_gateway_key_secret: String::new(),
            payment_currency: default_currency(),
            payment_gateway_timeout_secs: default_gateway_timeout_secs(),
            upload_dir: default_upload_dir(),
            upload_max_bytes: default_upload_max_bytes(),
            notification_webhook_url: None,
            cors_allowed_origins: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
            || self.environment.eq_ignore_ascii_case("test")
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Loads configuration from `config/` files overlaid with `APP__`-prefixed
/// environment variables.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret has no default: it must come from the environment or a
    // config file so an insecure fallback can never reach production.
    let builder = Config::builder()
        .set_default("database_url", "sqlite://printhub.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET with a secure random string (minimum 32 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET.".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    if app_config.payment_gateway_key_secret.is_empty() {
        warn!("Payment gateway secret is not configured; intent creation and callback verification will fail until APP__PAYMENT_GATEWAY_KEY_SECRET is set");
    }

    Ok(app_config)
}

/// Initializes the tracing subscriber. Honors `RUST_LOG` when set, otherwise
/// derives a default directive from the configured level.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("printhub_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(filter_directive)
            .json()
            .try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}
