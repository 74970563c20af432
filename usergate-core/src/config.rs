//! Process-wide configuration
//!
//! Loaded once at startup from an optional TOML file, then overridden by
//! environment variables, then validated. The auth token has no default:
//! a process without one refuses to start.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0:7002"
//! debug = false
//!
//! [auth]
//! token = "change-me"
//! protected_prefix = "/api/rest"
//! ```

use crate::auth::BearerGate;
use crate::error::{Result, UsergateError};
use crate::routes::{RouteTable, DEFAULT_PROTECTED_PREFIX};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable carrying the bearer token
pub const ENV_AUTH_TOKEN: &str = "USERGATE_AUTH_TOKEN";

/// Environment variable overriding the listen address
pub const ENV_BIND_ADDRESS: &str = "USERGATE_BIND_ADDRESS";

/// Environment variable overriding debug mode
pub const ENV_DEBUG: &str = "USERGATE_DEBUG";

/// Default listen address
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:7002";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UsergateConfig {
    /// Listener settings
    pub server: ServerSettings,
    /// Gate settings
    pub auth: AuthSettings,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    /// Socket address to bind
    pub bind_address: String,
    /// Include diagnostics in responses
    pub debug: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            debug: false,
        }
    }
}

/// Gate settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSettings {
    /// The one valid bearer token
    pub token: Option<String>,
    /// Path subtree the gate guards
    pub protected_prefix: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            token: None,
            protected_prefix: DEFAULT_PROTECTED_PREFIX.to_string(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("protected_prefix", &self.protected_prefix)
            .finish()
    }
}

impl UsergateConfig {
    /// Configuration with only a token set
    pub fn with_token(token: impl Into<String>) -> Self {
        let mut config = UsergateConfig::default();
        config.auth.token = Some(token.into());
        config
    }

    /// Parse TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        debug!("Read configuration from {:?}", path);
        Ok(config)
    }

    /// File (if any), then process environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            "Configuration loaded (bind {}, protected prefix {})",
            config.server.bind_address, config.auth.protected_prefix
        );
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_AUTH_TOKEN) {
            debug!("Auth token taken from {}", ENV_AUTH_TOKEN);
            self.auth.token = Some(token);
        }
        if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
            self.server.bind_address = addr;
        }
        if let Some(flag) = lookup(ENV_DEBUG) {
            self.server.debug = parse_flag(&flag).ok_or_else(|| {
                UsergateError::ConfigError(format!("{} must be true or false, got {:?}", ENV_DEBUG, flag))
            })?;
        }
        Ok(())
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        match self.auth.token.as_deref() {
            None => {
                return Err(UsergateError::ConfigError(format!(
                    "no auth token configured (set [auth] token or {})",
                    ENV_AUTH_TOKEN
                )))
            }
            Some("") => {
                return Err(UsergateError::ConfigError(
                    "auth token must not be empty".to_string(),
                ))
            }
            Some(_) => {}
        }

        self.bind_addr()?;

        let prefix = &self.auth.protected_prefix;
        if !prefix.starts_with('/') || prefix.ends_with('/') {
            return Err(UsergateError::ConfigError(format!(
                "protected_prefix must be an absolute path without trailing slash, got {:?}",
                prefix
            )));
        }
        Ok(())
    }

    /// Parsed listen address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind_address.parse().map_err(|e| {
            UsergateError::ConfigError(format!(
                "invalid bind address {:?}: {}",
                self.server.bind_address, e
            ))
        })
    }

    /// Build the gate from the configured token
    pub fn gate(&self) -> Result<BearerGate> {
        let token = self.auth.token.clone().ok_or_else(|| {
            UsergateError::ConfigError(format!("no auth token configured ({})", ENV_AUTH_TOKEN))
        })?;
        BearerGate::new(token)
    }

    /// Build the user route table under the configured prefix
    pub fn route_table(&self) -> Result<RouteTable> {
        RouteTable::users(self.auth.protected_prefix.clone())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
