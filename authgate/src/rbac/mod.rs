//! Role-based access control store contract.
//!
//! The gateway only needs three operations from the RBAC engine: read a user's roles, grant a
//! role, and list a user's effective permissions. Rule storage and permission computation stay
//! behind this trait. [`InMemoryRbac`] is the implementation the server runs with.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::errors::Result;

pub mod memory;

pub use memory::InMemoryRbac;

#[async_trait]
pub trait RbacStore: Send + Sync {
    /// Roles currently assigned to `username`; empty for unknown users
    async fn get_user_roles(&self, username: &str) -> Result<BTreeSet<String>>;

    /// Grant `role` to `username`.
    ///
    /// Must be idempotent: granting a role the user already holds leaves the set unchanged.
    /// First-login bootstrap relies on this when two logins for a new user race.
    async fn add_role_for_user(&self, username: &str, role: &str) -> Result<()>;

    /// Effective permission identifiers of `username`, sorted and without duplicates
    async fn get_permissions_for_user(&self, username: &str) -> Result<Vec<String>>;
}
