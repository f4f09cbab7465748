//! Password backend: verifies credentials against locally configured Argon2 hashes.

use async_trait::async_trait;
use std::{collections::HashMap, path::Path};
use tracing::{debug, instrument};

use crate::{
    auth::{
        backend::{AuthenticationBackend, DefaultRole},
        password,
    },
    config::BackendConfig,
    errors::{Error, Result},
};

#[derive(Debug)]
pub struct BasicBackend {
    name: String,
    /// Username to Argon2 PHC hash
    users: HashMap<String, String>,
    default_role: DefaultRole,
}

impl BasicBackend {
    pub fn new(name: &str, users: HashMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            users,
            default_role: DefaultRole::default(),
        }
    }

    /// Build from an `auth.<name>` section. Users from `file` are loaded first; inline `users`
    /// entries override them.
    pub fn from_config(name: &str, config: &BackendConfig) -> Result<Self> {
        let mut users = match &config.file {
            Some(path) => load_htpasswd(path)?,
            None => HashMap::new(),
        };
        users.extend(config.users.iter().map(|(user, hash)| (user.clone(), hash.clone())));

        if users.is_empty() {
            tracing::warn!("Basic backend {} has no users configured; every login will fail", name);
        }
        Ok(Self::new(name, users))
    }
}

/// Read `username:hash` lines. Blank lines and `#` comments are skipped.
fn load_htpasswd(path: &Path) -> Result<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Internal {
        operation: format!("read password file {}: {e}", path.display()),
    })?;

    let mut users = HashMap::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((user, hash)) = line.split_once(':') else {
            return Err(Error::Internal {
                operation: format!("parse password file {} line {}: expected username:hash", path.display(), index + 1),
            });
        };
        users.insert(user.to_string(), hash.to_string());
    }
    Ok(users)
}

#[async_trait]
impl AuthenticationBackend for BasicBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_user_role(&self, _user: &str) -> String {
        self.default_role.get()
    }

    fn set_default_user_role(&self, role: &str) {
        self.default_role.set(role);
    }

    #[instrument(skip(self, password), fields(backend = %self.name))]
    async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let rejected = || Error::BackendAuthentication {
            backend: self.name.clone(),
            message: format!("invalid username or password for {username}"),
        };

        let Some(hash) = self.users.get(username).cloned() else {
            debug!("Unknown user");
            return Err(rejected());
        };

        // Verify on a blocking thread to avoid stalling the async runtime
        let candidate = password.to_string();
        let verified = tokio::task::spawn_blocking(move || password::verify_string(&candidate, &hash))
            .await
            .map_err(|e| Error::Internal {
                operation: format!("spawn password verification task: {e}"),
            })??;

        if !verified {
            debug!("Password mismatch");
            return Err(rejected());
        }

        Ok(password::generate_session_token())
    }
}
