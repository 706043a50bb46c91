//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.
//! Settings are loaded once at start-up and carried in the application state.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

const DEV_JWT_SECRET: &str = "devcamper-dev-secret-change-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 5000,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    pub require_tls: bool,
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Token signing and cookie lifetime
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expire_days: i64,
    pub cookie_expire_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEV_JWT_SECRET.to_string(),
            expire_days: 30,
            cookie_expire_days: 30,
        }
    }
}

/// Photo upload limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub path: PathBuf,
    pub max_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./public/uploads"),
            max_size: 1_000_000,
        }
    }
}

/// SMTP relay used for password reset mails
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    pub from_email: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2525,
            username: None,
            password: None,
            from_name: "DevCamper".to_string(),
            from_email: "noreply@devcamper.io".to_string(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub app_env: String,
    /// `None` runs against the in-memory store
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
    pub mail: MailConfig,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parsed variable, or the default when absent or unparsable
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let server = ServerConfig {
            host: env_parse("HOST", defaults.server.host),
            port: env_parse("PORT", defaults.server.port),
        };

        let database = match env_var("DATABASE_URL") {
            Some(url) => Some(Self::parse_database_url(
                &url,
                env_parse("DB_MAX_CONNECTIONS", 10),
            )?),
            None => None,
        };

        let cors = CorsConfig {
            allowed_origins: env_var("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors.allowed_origins),
        };

        let jwt = JwtConfig {
            secret: env_var("JWT_SECRET").unwrap_or_else(|| {
                warn!("JWT_SECRET not set, using development default");
                defaults.jwt.secret.clone()
            }),
            expire_days: env_parse("JWT_EXPIRE_DAYS", defaults.jwt.expire_days),
            cookie_expire_days: env_parse("JWT_COOKIE_EXPIRE_DAYS", defaults.jwt.cookie_expire_days),
        };

        let upload = UploadConfig {
            path: env_var("FILE_UPLOAD_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload.path),
            max_size: env_parse("MAX_FILE_UPLOAD", defaults.upload.max_size),
        };

        let mail = MailConfig {
            host: env_var("SMTP_HOST").unwrap_or(defaults.mail.host),
            port: env_parse("SMTP_PORT", defaults.mail.port),
            username: env_var("SMTP_USERNAME"),
            password: env_var("SMTP_PASSWORD"),
            from_name: env_var("FROM_NAME").unwrap_or(defaults.mail.from_name),
            from_email: env_var("FROM_EMAIL").unwrap_or(defaults.mail.from_email),
        };

        Ok(Self {
            server,
            app_env: env_var("APP_ENV").unwrap_or_else(|| "development".to_string()),
            database,
            cors,
            jwt,
            upload,
            mail,
        })
    }

    /// Database settings for commands that must persist their writes
    pub fn require_database(&self) -> Result<&DatabaseConfig, ConfigError> {
        self.database
            .as_ref()
            .ok_or(ConfigError::Missing("DATABASE_URL must be set to seed a database"))
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// Parse a DATABASE_URL connection string (postgresql://...)
    fn parse_database_url(url: &str, max_pool_size: usize) -> Result<DatabaseConfig, ConfigError> {
        let parsed = url::Url::parse(url).map_err(|_| {
            ConfigError::InvalidValue(
                "Invalid DATABASE_URL format (expected postgresql://...)".to_string(),
            )
        })?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidValue("Missing host in DATABASE_URL".to_string()))?
            .to_string();

        let require_tls = host.contains("neon.tech")
            || parsed
                .query_pairs()
                .any(|(k, v)| k == "sslmode" && v == "require");

        Ok(DatabaseConfig {
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().map(|p| p.to_string()).unwrap_or_default(),
            database: parsed.path().trim_start_matches('/').to_string(),
            host,
            max_pool_size,
            require_tls,
        })
    }
}
