//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SWITCHBOARD_ADMIN_PASSWORD` - Password for the admin identity (min 12 chars)
//!
//! ## Optional
//! - `SWITCHBOARD_HOST` - Bind address (default: 127.0.0.1)
//! - `SWITCHBOARD_PORT` - Listen port (default: 3000)
//! - `SWITCHBOARD_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `SWITCHBOARD_ADMIN_EMAIL` - Reserved admin email (default: admin@switchboard.local)
//! - `SWITCHBOARD_ADMIN_NAME` - Admin display name (default: Admin)
//! - `SWITCHBOARD_UPLOAD_DIR` - Where profile photos are written (default: uploads)
//! - `SWITCHBOARD_AVATAR_DIR` - Built-in avatar images (default: `static/avatars` in this crate's source tree)
//! - `SWITCHBOARD_MAX_UPLOAD_BYTES` - Upload size limit (default: 5 MiB)
//! - `SWITCHBOARD_DATABASE_URL` / `DATABASE_URL` - `PostgreSQL` for persistence
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use switchboard_core::Email;

const MIN_ADMIN_PASSWORD_LENGTH: usize = 12;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Built-in avatars shipped with the crate, independent of the working
/// directory.
const DEFAULT_AVATAR_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static/avatars");

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL; `https` enables secure cookies
    pub base_url: String,
    /// The reserved admin identity
    pub admin: AdminConfig,
    /// Directory uploaded profile photos are written to
    pub upload_dir: PathBuf,
    /// Directory holding the built-in avatar images
    pub avatar_dir: PathBuf,
    /// Largest accepted profile photo, in bytes
    pub max_upload_bytes: usize,
    /// `PostgreSQL` connection URL; persistence is off when unset
    pub database_url: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// The admin identity seeded at startup.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminConfig {
    /// Reserved email; registration can never claim it
    pub email: Email,
    /// Display name
    pub name: String,
    /// Sign-in password
    pub password: SecretString,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the admin password fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("SWITCHBOARD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SWITCHBOARD_HOST".to_owned(), e.to_string())
            })?;
        let port = get_env_or_default("SWITCHBOARD_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SWITCHBOARD_PORT".to_owned(), e.to_string())
            })?;
        let base_url = get_env_or_default("SWITCHBOARD_BASE_URL", "http://localhost:3000");
        let admin = AdminConfig::from_env()?;
        let upload_dir = PathBuf::from(get_env_or_default("SWITCHBOARD_UPLOAD_DIR", "uploads"));
        let avatar_dir = PathBuf::from(get_env_or_default(
            "SWITCHBOARD_AVATAR_DIR",
            DEFAULT_AVATAR_DIR,
        ));
        let max_upload_bytes = get_optional_env("SWITCHBOARD_MAX_UPLOAD_BYTES")
            .map(|v| {
                v.parse::<usize>().map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "SWITCHBOARD_MAX_UPLOAD_BYTES".to_owned(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let database_url = get_database_url("SWITCHBOARD_DATABASE_URL");
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            host,
            port,
            base_url,
            admin,
            upload_dir,
            avatar_dir,
            max_upload_bytes,
            database_url,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Configuration for a local instance with persistence off, listening on
    /// an ephemeral port.
    #[must_use]
    pub fn local(admin: AdminConfig, upload_dir: PathBuf) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://localhost".to_owned(),
            admin,
            upload_dir,
            avatar_dir: PathBuf::from(DEFAULT_AVATAR_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            database_url: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
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

impl AdminConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let email = Email::parse(&get_env_or_default(
            "SWITCHBOARD_ADMIN_EMAIL",
            "admin@switchboard.local",
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("SWITCHBOARD_ADMIN_EMAIL".to_owned(), e.to_string()))?;
        let name = get_env_or_default("SWITCHBOARD_ADMIN_NAME", "Admin");
        let password = get_required_secret("SWITCHBOARD_ADMIN_PASSWORD")?;
        validate_admin_password(&password, "SWITCHBOARD_ADMIN_PASSWORD")?;

        Ok(Self {
            email,
            name,
            password,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    get_optional_env(primary_key)
        .or_else(|| get_optional_env("DATABASE_URL"))
        .map(SecretString::from)
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Validate that the admin password is long enough and not a placeholder.
fn validate_admin_password(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.chars().count() < MIN_ADMIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_PASSWORD_LENGTH,
                value.chars().count()
            ),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_owned(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn admin() -> AdminConfig {
        AdminConfig {
            email: Email::parse("admin@x.com").unwrap(),
            name: "Admin".to_owned(),
            password: SecretString::from("correct horse battery staple"),
        }
    }

    #[test]
    fn test_validate_admin_password_too_short() {
        let result = validate_admin_password(&SecretString::from("short"), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_admin_password_placeholder() {
        for value in ["changeme-changeme", "your-admin-password", "PLACEHOLDER-VALUE"] {
            let result = validate_admin_password(&SecretString::from(value), "TEST_VAR");
            assert!(result.is_err(), "{value} should be rejected");
        }
    }

    #[test]
    fn test_validate_admin_password_valid() {
        let result = validate_admin_password(
            &SecretString::from("correct horse battery staple"),
            "TEST_VAR",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr_and_security() {
        let mut config = ServerConfig::local(admin(), PathBuf::from("uploads"));
        config.port = 3000;

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());

        config.base_url = "https://chat.example.org".to_owned();
        assert!(config.is_secure());
    }

    #[test]
    fn test_default_avatar_dir_holds_builtin_avatars() {
        let config = ServerConfig::local(admin(), PathBuf::from("uploads"));
        assert!(config.avatar_dir.is_absolute());
        for name in switchboard_core::DEFAULT_AVATARS {
            assert!(config.avatar_dir.join(name).is_file(), "missing {name}");
        }
    }

    #[test]
    fn test_admin_config_debug_redacts_password() {
        let debug_output = format!("{:?}", admin());
        assert!(debug_output.contains("admin@x.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("battery"));
    }
}
