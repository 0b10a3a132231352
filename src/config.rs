use crate::auth::JwtVerifier;
use crate::schemas::AppState;
use anyhow::{Context, Result, bail};
use config::{Config, ConfigBuilder, Environment, builder::DefaultState};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://housesplit.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3001";

/// Runtime settings, read from the environment (and `.env`) on top of defaults
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    /// HS256 signing secret; the server refuses to start without it
    pub jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
    pub request_timeout_secs: u64,
    /// Comma-separated list of extra CORS origins
    pub cors_allowed_origins: String,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("database_url", &self.database_url)
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .finish()
    }
}

impl Settings {
    /// Builder preloaded with defaults for every optional key
    pub fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("token_ttl_hours", 24)?
            .set_default("request_timeout_secs", 30)?
            .set_default("cors_allowed_origins", "")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings = builder
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")?;
        Ok(settings)
    }

    /// Load settings from `.env` and process environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let builder = Self::builder()?.add_source(Environment::default().try_parsing(true));
        let settings = Self::from_builder(builder)?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn jwt_secret(&self) -> Result<&str> {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => bail!("JWT_SECRET must be set to a non-empty value"),
        }
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn verifier(&self) -> Result<JwtVerifier> {
        Ok(JwtVerifier::new(self.jwt_secret()?, self.token_ttl_hours))
    }
}

/// Open a pooled connection to the configured database
pub async fn connect_database(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database: {}", database_url);
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);

    match Database::connect(options).await {
        Ok(db) => {
            debug!("Database connection established");
            Ok(db)
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            Err(e.into())
        }
    }
}

/// Initialize application state from settings
pub async fn initialize_app_state(settings: &Settings) -> Result<AppState> {
    let verifier = settings.verifier()?;
    let db = connect_database(&settings.database_url).await?;

    Ok(AppState {
        db,
        verifier: Arc::new(verifier),
    })
}
