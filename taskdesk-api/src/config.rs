/// Configuration management for the API server
///
/// Configuration comes from environment variables, with `.env` support for
/// development.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `API_PRODUCTION`: Production mode flag (default: false)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: any)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SESSION_SECRET`: Session signing key, at least 32 characters (required)
/// - `SESSION_COOKIE_NAME`: Cookie name (default: taskdesk_session)
/// - `SESSION_LIFETIME_HOURS`: Session lifetime (default: 336, two weeks)
/// - `SESSION_COOKIE_SECURE`: Mark the cookie `Secure` (default: production flag)
/// - `LANDING_PATH`: Where sign-in and sign-out redirect (default: /)
/// - `CLARITY_PROJECT_ID`: Microsoft Clarity project (default: none)
/// - `CLARITY_ENABLED`: Clarity tracking switch (default: true; no tag without a project id)
///
/// # Example
///
/// ```no_run
/// use taskdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::analytics::{AnalyticsOptions, ClarityOptions};

/// Minimum session secret length in characters
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted session lifetime in hours (ten years)
pub const MAX_SESSION_LIFETIME_HOURS: i64 = 24 * 365 * 10;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Session cookie configuration
    pub session: SessionConfig,

    /// Analytics tag configuration
    pub analytics: AnalyticsOptions,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode tightens security headers
    pub production: bool,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Default redirect after sign-in and sign-out
    pub landing_path: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key for signing session tokens
    ///
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,

    /// Session cookie name
    pub cookie_name: String,

    /// Lifetime of a session, and Max-Age of a persistent cookie
    pub lifetime_hours: i64,

    /// Send the cookie over HTTPS only
    pub cookie_secure: bool,
}

impl SessionConfig {
    pub fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(self.lifetime_hours)
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "API_PORT", 8080u16)?;
        let production = parse_or(&lookup, "API_PRODUCTION", false)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let landing_path = lookup("LANDING_PATH").unwrap_or_else(|| "/".to_string());
        if !landing_path.starts_with('/') {
            anyhow::bail!("LANDING_PATH must be a local path starting with '/'");
        }

        let database_url = lookup("DATABASE_URL")
            .context("DATABASE_URL environment variable is required")?;
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;

        let secret = lookup("SESSION_SECRET")
            .context("SESSION_SECRET environment variable is required")?;
        if secret.chars().count() < MIN_SECRET_LENGTH {
            anyhow::bail!(
                "SESSION_SECRET must be at least {} characters long",
                MIN_SECRET_LENGTH
            );
        }

        let cookie_name =
            lookup("SESSION_COOKIE_NAME").unwrap_or_else(|| "taskdesk_session".to_string());
        let lifetime_hours = parse_or(&lookup, "SESSION_LIFETIME_HOURS", 336i64)?;
        if lifetime_hours <= 0 || lifetime_hours > MAX_SESSION_LIFETIME_HOURS {
            anyhow::bail!(
                "SESSION_LIFETIME_HOURS must be between 1 and {}",
                MAX_SESSION_LIFETIME_HOURS
            );
        }
        let cookie_secure = parse_or(&lookup, "SESSION_COOKIE_SECURE", production)?;

        let clarity = ClarityOptions {
            project_id: lookup("CLARITY_PROJECT_ID")
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            enabled: parse_or(&lookup, "CLARITY_ENABLED", true)?,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
                landing_path,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            session: SessionConfig {
                secret,
                cookie_name,
                lifetime_hours,
                cookie_secure,
            },
            analytics: AnalyticsOptions { clarity },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
