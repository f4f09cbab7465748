//! First-login role bootstrap and permission cookie refresh.

use tracing::{info, instrument};

use crate::{
    auth::{backend::AuthenticationBackend, session::permissions_cookie},
    errors::Result,
    rbac::RbacStore,
};

/// Permissions of a freshly authenticated user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrapped {
    pub permissions: Vec<String>,
    /// `Set-Cookie` value carrying `permissions`
    pub cookie: String,
}

/// Grant the backend's default role to a user that holds no role yet, then recompute the
/// user's permissions.
///
/// The read-then-grant is not atomic. Two concurrent first logins may both grant the default
/// role, which the store's idempotent grant absorbs.
#[instrument(skip(rbac, backend), fields(backend = backend.name()))]
pub async fn bootstrap_user(rbac: &dyn RbacStore, backend: &dyn AuthenticationBackend, username: &str) -> Result<Bootstrapped> {
    let roles = rbac.get_user_roles(username).await?;
    if roles.is_empty() {
        let role = backend.default_user_role(username);
        rbac.add_role_for_user(username, &role).await?;
        info!(role = %role, "Granted default role on first login");
    }

    let permissions = rbac.get_permissions_for_user(username).await?;
    let cookie = permissions_cookie(&permissions)?;
    Ok(Bootstrapped { permissions, cookie })
}
