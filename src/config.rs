//! Application configuration.
//!
//! Settings come from `config/default.toml`, an optional per-environment
//! file, and `APP__*` environment variables, in that order. The per-litre
//! milk price is configuration like everything else and is threaded into
//! the services explicitly — there is no process-global price.

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL (SQLite or Postgres).
    pub database_url: String,

    /// JWT signing secret. No default: must come from the environment.
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// JWT lifetime in seconds.
    pub jwt_expiration: usize,

    /// Server bind host.
    pub host: String,

    /// Server bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment name (development, production, test).
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,

    /// Run migrations on startup.
    #[serde(default)]
    pub auto_migrate: bool,

    /// Price charged per litre, applied uniformly to every conversion.
    #[serde(default = "default_price_per_litre")]
    pub price_per_litre: Decimal,

    /// Twilio credentials for WhatsApp dispatch. All three must be present
    /// for the send endpoint to work; otherwise it reports a typed failure.
    #[serde(default)]
    pub twilio_account_sid: Option<String>,
    #[serde(default)]
    pub twilio_auth_token: Option<String>,
    /// Sender in `whatsapp:+14155238886` form.
    #[serde(default)]
    pub twilio_whatsapp_number: Option<String>,

    /// Public base URL bills are served from, used as the WhatsApp media
    /// link (Twilio fetches media over HTTP, it does not accept payloads).
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Seed operator credentials, applied at startup when the users table
    /// is empty.
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_price_per_litre() -> Decimal {
    Decimal::new(50, 0)
}

impl AppConfig {
    /// Direct constructor for tests and embedded use.
    pub fn new(
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        jwt_expiration: usize,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration,
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            price_per_litre: default_price_per_litre(),
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_whatsapp_number: None,
            public_base_url: None,
            admin_username: None,
            admin_password: None,
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Loads configuration in ascending priority:
/// 1. Built-in defaults
/// 2. `config/default.toml`
/// 3. `config/{RUN_ENV}.toml`
/// 4. `APP__*` environment variables
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret has no default on purpose: an insecure fallback must never
    // reach production.
    let builder = Config::builder()
        .set_default("database_url", "sqlite://milkbill.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env.clone())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("price_per_litre", "50")?
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{run_env}")).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a secure random string.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    info!(environment = %app_config.environment, "configuration loaded");
    Ok(app_config)
}

/// Initializes tracing with the configured level as the default filter.
/// `RUST_LOG` overrides when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_directive = format!("milkbill_api={level},tower_http=info");
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));
    if json {
        let _ = registry.with(fmt::layer().json()).try_init();
    } else {
        let _ = registry.with(fmt::layer()).try_init();
    }
}
