//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use gondola_observability::LogFormat;

/// Signing key used when `JWT_SECRET` is unset outside production.
pub const DEV_JWT_SECRET: &str = "gondola-insecure-dev-secret";

const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_BOOTSTRAP_ORG_NAME: &str = "Platform";
const DEFAULT_BOOTSTRAP_ORG_SLUG: &str = "platform";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when APP_ENV=production")]
    MissingSecret,

    #[error("JWT_SECRET must not be empty")]
    EmptySecret,

    #[error("token lifetime must be a positive number of seconds")]
    InvalidTokenTtl,

    #[error("{var}: {message}")]
    Invalid { var: &'static str, message: String },
}

fn invalid(var: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        message: message.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Test,
    Production,
}

impl core::str::FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "test" => Ok(AppEnv::Test),
            "production" | "prod" => Ok(AppEnv::Production),
            other => Err(invalid("APP_ENV", format!("unknown environment '{other}'"))),
        }
    }
}

/// Token signing settings shared by the issuer and the validator.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    secret: String,
    token_ttl: chrono::Duration,
    dev_secret: bool,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, token_ttl: chrono::Duration) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if token_ttl <= chrono::Duration::zero() {
            return Err(ConfigError::InvalidTokenTtl);
        }
        Ok(Self {
            secret,
            token_ttl,
            dev_secret: false,
        })
    }

    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        self.token_ttl
    }

    /// Whether the built-in development secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.dev_secret
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("dev_secret", &self.dev_secret)
            .finish()
    }
}

/// Credentials for an `admin` account created at startup, and the
/// organization it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub organization_name: String,
    pub organization_slug: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("organization_slug", &self.organization_slug)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub env: AppEnv,
    pub server_addr: SocketAddr,
    pub auth: AuthConfig,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub request_timeout: Duration,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ApiConfig {
    /// Load from the process environment, after reading an optional `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let env = get("APP_ENV").map(|v| v.parse::<AppEnv>()).transpose()?.unwrap_or_default();

        let server_addr = get("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("SERVER_ADDR", format!("{e}")))?;

        let token_ttl_secs = match get("JWT_EXPIRATION_SECS") {
            Some(v) => v
                .trim()
                .parse::<i64>()
                .map_err(|e| invalid("JWT_EXPIRATION_SECS", format!("{e}")))?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };
        let token_ttl = chrono::Duration::try_seconds(token_ttl_secs).ok_or(ConfigError::InvalidTokenTtl)?;

        let auth = match lookup("JWT_SECRET") {
            Some(secret) => AuthConfig::new(secret, token_ttl)?,
            None if env == AppEnv::Production => return Err(ConfigError::MissingSecret),
            None => AuthConfig {
                dev_secret: true,
                ..AuthConfig::new(DEV_JWT_SECRET, token_ttl)?
            },
        };

        let log_format = get("LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>().map_err(|e| invalid("LOG_FORMAT", e)))
            .transpose()?
            .unwrap_or_default();

        let request_timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("REQUEST_TIMEOUT_SECS", format!("{e}")))?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        if request_timeout_secs == 0 {
            return Err(invalid("REQUEST_TIMEOUT_SECS", "must be positive"));
        }

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                organization_name: get("BOOTSTRAP_ORG_NAME")
                    .unwrap_or_else(|| DEFAULT_BOOTSTRAP_ORG_NAME.to_string()),
                organization_slug: get("BOOTSTRAP_ORG_SLUG")
                    .unwrap_or_else(|| DEFAULT_BOOTSTRAP_ORG_SLUG.to_string()),
            }),
            (None, None) => None,
            _ => {
                return Err(invalid(
                    "BOOTSTRAP_ADMIN_EMAIL",
                    "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together",
                ));
            }
        };

        Ok(Self {
            env,
            server_addr,
            auth,
            log_format,
            database_url: get("DATABASE_URL"),
            request_timeout: Duration::from_secs(request_timeout_secs),
            bootstrap_admin,
        })
    }
}
