//! Disabled backend: authentication is turned off and every request is let through.

use async_trait::async_trait;

use crate::{
    auth::backend::{AuthenticationBackend, DefaultRole},
    errors::Result,
};

/// Identity attached to requests when authentication is disabled
pub const NOAUTH_USERNAME: &str = "admin";

#[derive(Debug)]
pub struct NoAuthBackend {
    name: String,
    default_role: DefaultRole,
}

impl NoAuthBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default_role: DefaultRole::default(),
        }
    }
}

#[async_trait]
impl AuthenticationBackend for NoAuthBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_user_role(&self, _user: &str) -> String {
        self.default_role.get()
    }

    fn set_default_user_role(&self, role: &str) {
        self.default_role.set(role);
    }

    async fn authenticate(&self, _username: &str, _password: &str) -> Result<String> {
        Ok(String::new())
    }

    fn requires_credentials(&self) -> bool {
        false
    }
}
