//! Shared test fixtures.

use axum_test::TestServer;
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use crate::{
    Application,
    auth::{authenticator::Authenticator, backend::AuthenticationBackend, basic::BasicBackend, noauth::NoAuthBackend, password},
    config::{BackendConfig, Config, RbacConfig},
    rbac::InMemoryRbac,
};

pub use crate::install_crypto_provider;

/// Default config with `name` as the only, active backend
pub fn config_with_backend(name: &str, backend: BackendConfig) -> Config {
    let mut config = Config::default();
    config.auth.backend = name.to_string();
    config.auth.backends = [(name.to_string(), backend)].into();
    config
}

/// Roles every test store knows about
pub fn test_rbac_config() -> RbacConfig {
    RbacConfig {
        roles: BTreeMap::from([
            (
                "operator".to_string(),
                vec!["topology.read".to_string(), "capture.write".to_string()],
            ),
            (
                "admin".to_string(),
                vec!["topology.read".to_string(), "topology.write".to_string()],
            ),
        ]),
        assignments: BTreeMap::new(),
    }
}

fn hashed_users(users: &[(&str, &str)]) -> HashMap<String, String> {
    users
        .iter()
        .map(|(user, secret)| (user.to_string(), password::hash_string(secret).expect("Failed to hash test password")))
        .collect()
}

/// Config for a `basic` backend holding `users` (plaintext passwords, hashed here)
pub fn basic_config(users: &[(&str, &str)], role: &str) -> Config {
    let users = hashed_users(users);

    let mut config = config_with_backend(
        "default",
        BackendConfig {
            kind: Some("basic".to_string()),
            role: Some(role.to_string()),
            users,
            ..Default::default()
        },
    );
    config.rbac = test_rbac_config();
    config
}

/// Authenticator over a `basic` backend, with its RBAC store for inspection
pub fn basic_authenticator(users: &[(&str, &str)], role: &str) -> (Authenticator, Arc<InMemoryRbac>) {
    let users = hashed_users(users);
    let backend = BasicBackend::new("default", users);
    backend.set_default_user_role(role);

    let rbac = Arc::new(InMemoryRbac::from_config(&test_rbac_config()));
    (Authenticator::new(Arc::new(backend), rbac.clone()), rbac)
}

pub fn noauth_authenticator() -> Authenticator {
    Authenticator::new(Arc::new(NoAuthBackend::new("default")), Arc::new(InMemoryRbac::new()))
}

pub async fn create_test_server(config: Config) -> TestServer {
    install_crypto_provider();
    Application::new(config)
        .await
        .expect("Failed to create test application")
        .into_test_server()
}
