//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `AUTHGATE_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `AUTHGATE_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `AUTHGATE_AUTH__DEFAULT__TYPE=noauth` sets the `auth.default.type` field.
//!
//! ## Configuration Structure
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 8082
//! auth:
//!   backend: default          # which named backend serves requests
//!   default:
//!     type: basic             # basic | keystone | noauth
//!     role: operator          # role granted on first login
//!     users:
//!       alice: $argon2id$v=19$...
//!   corporate:
//!     type: keystone
//!     auth_url: http://keystone:5000
//!     domain_name: Default
//!     tenant_name: admin
//! http:
//!   cookie:                   # extra cookies sent on outbound calls (e.g. for proxies)
//!     route: blue
//! rbac:
//!   roles:
//!     operator: [topology.read, capture.write]
//!   assignments:
//!     bob: [admin]
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    time::Duration,
};
use url::Url;

use crate::errors::Error;

/// Role granted on first login when a backend does not configure one
pub const DEFAULT_USER_ROLE: &str = "admin";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "AUTHGATE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,

    /// Print the Argon2 hash of the given password, for `auth.<name>.users`, and exit.
    #[arg(long, value_name = "PASSWORD")]
    pub hash_password: Option<String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Authentication backends, keyed by name
    pub auth: AuthConfig,
    /// Outbound HTTP settings
    pub http: HttpConfig,
    /// Seed data for the in-memory RBAC store
    pub rbac: RbacConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// Authentication configuration: the active backend plus every named backend section.
///
/// Backend sections live directly under `auth`, so `auth.<name>.type` selects the
/// implementation for backend `<name>`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Name of the backend used to authenticate incoming requests
    pub backend: String,
    /// Named backend sections
    #[serde(flatten)]
    pub backends: HashMap<String, BackendConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            backend: "default".to_string(),
            backends: HashMap::new(),
        }
    }
}

/// One `auth.<name>` section.
///
/// Only the keys relevant to the selected `type` are read; the rest keep their defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Backend type discriminant: `basic`, `keystone` or `noauth`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Role granted to users on their first successful login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    // basic
    /// Username to Argon2 PHC hash
    pub users: HashMap<String, String>,
    /// htpasswd-style file of `username:hash` lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    // keystone
    /// Identity service endpoint, e.g. `http://keystone:5000`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<Url>,
    /// Domain the users belong to
    pub domain_name: String,
    /// Project to scope the issued token to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<String>,
    /// Timeout for calls to the identity service
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: None,
            role: None,
            users: HashMap::new(),
            file: None,
            auth_url: None,
            domain_name: "Default".to_string(),
            tenant_name: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Outbound HTTP configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    /// Cookies appended to every outbound call, usually required by a proxy in front
    /// of the remote instance
    pub cookie: BTreeMap<String, String>,
}

/// Seed data for the in-memory RBAC store.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RbacConfig {
    /// Role name to the permission identifiers it grants
    pub roles: BTreeMap<String, Vec<String>>,
    /// Username to roles assigned before the user ever logs in
    pub assignments: BTreeMap<String, Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            auth: AuthConfig::default(),
            http: HttpConfig::default(),
            rbac: RbacConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values. AUTHGATE_CONFIG
            // names the file itself and is not a config key.
            .merge(Env::prefixed("AUTHGATE_").ignore(&["config"]).split("__"))
    }

    /// Validate the configuration for consistency and required fields.
    ///
    /// Backend types are checked when the backend is built, so an unknown type surfaces
    /// as [`Error::BackendConfiguration`] naming the backend.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.auth.backends.contains_key(&self.auth.backend) {
            return Err(Error::BackendConfiguration {
                name: self.auth.backend.clone(),
            });
        }

        for (name, backend) in &self.auth.backends {
            if backend.role.as_deref().is_some_and(str::is_empty) {
                return Err(Error::Internal {
                    operation: format!("Config validation: auth.{name}.role cannot be empty"),
                });
            }
        }

        for (user, roles) in &self.rbac.assignments {
            if let Some(role) = roles.iter().find(|role| !self.rbac.roles.contains_key(*role)) {
                tracing::warn!("RBAC assignment for {} references undefined role {}", user, role);
            }
        }

        Ok(())
    }

    /// Look up the `auth.<name>` section
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.auth.backends.get(name)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
