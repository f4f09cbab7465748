//! Authentication backend abstraction and factory.
//!
//! A backend verifies a username/password pair and hands back an opaque session token. Which
//! implementation serves a backend name is decided by the `auth.<name>.type` configuration key:
//!
//! | `type`     | Implementation                          |
//! |------------|-----------------------------------------|
//! | `basic`    | [`BasicBackend`]: local password hashes |
//! | `keystone` | [`KeystoneBackend`]: identity service   |
//! | `noauth`   | [`NoAuthBackend`]: accepts everything   |
//!
//! Backends are built once at startup by [`new_backend_by_name`] and shared behind an `Arc` for
//! the life of the process.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::{fmt, sync::Arc};
use tracing::{info, instrument};

use crate::{
    auth::{basic::BasicBackend, keystone::KeystoneBackend, noauth::NoAuthBackend},
    config::{Config, DEFAULT_USER_ROLE},
    errors::{Error, Result},
};

#[async_trait]
pub trait AuthenticationBackend: Send + Sync + fmt::Debug {
    /// Stable identifier: the configured backend name
    fn name(&self) -> &str;

    /// Role granted to `user` on their first successful login
    fn default_user_role(&self, user: &str) -> String;

    /// Override the default role. Meant to be called once, before the backend serves traffic.
    fn set_default_user_role(&self, role: &str);

    /// Verify the credentials and return a session token. The token may be empty, in which
    /// case no session cookie is issued.
    async fn authenticate(&self, username: &str, password: &str) -> Result<String>;

    /// Whether requests must present credentials at all. Only the disabled backend says no.
    fn requires_credentials(&self) -> bool {
        true
    }
}

/// Default-role cell shared by the backend implementations.
///
/// Written once at startup and read on every first login; the swap keeps a later override
/// safe without locking readers.
pub struct DefaultRole(ArcSwap<String>);

impl DefaultRole {
    pub fn new(role: impl Into<String>) -> Self {
        Self(ArcSwap::from_pointee(role.into()))
    }

    pub fn get(&self) -> String {
        self.0.load().as_ref().clone()
    }

    pub fn set(&self, role: &str) {
        self.0.store(Arc::new(role.to_string()));
    }
}

impl Default for DefaultRole {
    fn default() -> Self {
        Self::new(DEFAULT_USER_ROLE)
    }
}

impl fmt::Debug for DefaultRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DefaultRole").field(&self.get()).finish()
    }
}

/// Build the backend configured under `auth.<name>`.
///
/// Fails with [`Error::BackendConfiguration`] when the section is missing or its `type` is
/// absent or not one of `basic`, `keystone`, `noauth`.
#[instrument(skip(config))]
pub fn new_backend_by_name(name: &str, config: &Config) -> Result<Arc<dyn AuthenticationBackend>> {
    let Some(section) = config.backend(name) else {
        return Err(Error::BackendConfiguration { name: name.to_string() });
    };

    let backend: Arc<dyn AuthenticationBackend> = match section.kind.as_deref() {
        Some("basic") => Arc::new(BasicBackend::from_config(name, section)?),
        Some("keystone") => Arc::new(KeystoneBackend::from_config(name, section)?),
        Some("noauth") => Arc::new(NoAuthBackend::new(name)),
        _ => return Err(Error::BackendConfiguration { name: name.to_string() }),
    };

    if let Some(role) = &section.role {
        backend.set_default_user_role(role);
    }

    info!(
        backend = backend.name(),
        kind = section.kind.as_deref().unwrap_or_default(),
        default_role = %backend.default_user_role(""),
        "Authentication backend ready"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::password,
        config::BackendConfig,
        test_utils::{config_with_backend, install_crypto_provider},
    };

    #[test]
    fn test_default_role_cell() {
        let role = DefaultRole::default();
        assert_eq!(role.get(), "admin");

        role.set("operator");
        assert_eq!(role.get(), "operator");
    }

    #[test]
    fn test_noauth_backend_by_name() {
        let config = config_with_backend(
            "default",
            BackendConfig {
                kind: Some("noauth".to_string()),
                ..Default::default()
            },
        );

        let backend = new_backend_by_name("default", &config).unwrap();
        assert_eq!(backend.name(), "default");
        assert!(!backend.requires_credentials());
        assert_eq!(backend.default_user_role("anyone"), "admin");
    }

    #[test]
    fn test_basic_backend_by_name_applies_role() {
        let hash = password::hash_string("secret").unwrap();
        let config = config_with_backend(
            "default",
            BackendConfig {
                kind: Some("basic".to_string()),
                role: Some("operator".to_string()),
                users: [("alice".to_string(), hash)].into(),
                ..Default::default()
            },
        );

        let backend = new_backend_by_name("default", &config).unwrap();
        assert!(backend.requires_credentials());
        assert_eq!(backend.default_user_role("alice"), "operator");
    }

    #[test]
    fn test_keystone_backend_by_name() {
        install_crypto_provider();
        let config = config_with_backend(
            "corp",
            BackendConfig {
                kind: Some("keystone".to_string()),
                auth_url: Some("http://keystone:5000".parse().unwrap()),
                ..Default::default()
            },
        );

        let backend = new_backend_by_name("corp", &config).unwrap();
        assert_eq!(backend.name(), "corp");
    }

    #[test]
    fn test_unknown_type_names_backend() {
        let config = config_with_backend(
            "corp",
            BackendConfig {
                kind: Some("ldap".to_string()),
                ..Default::default()
            },
        );

        let err = new_backend_by_name("corp", &config).unwrap_err();
        assert!(matches!(&err, Error::BackendConfiguration { name } if name == "corp"));
        assert!(err.to_string().contains("corp"));
    }

    #[test]
    fn test_missing_type_or_section() {
        let config = config_with_backend("corp", BackendConfig::default());

        assert!(matches!(
            new_backend_by_name("corp", &config),
            Err(Error::BackendConfiguration { name }) if name == "corp"
        ));
        assert!(matches!(
            new_backend_by_name("elsewhere", &config),
            Err(Error::BackendConfiguration { name }) if name == "elsewhere"
        ));
    }
}
