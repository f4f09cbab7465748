use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::{config::RbacConfig, errors::Result, rbac::RbacStore};

/// Process-local RBAC store.
///
/// Roles map to permission identifiers, users map to role names. Both maps are seeded from
/// [`RbacConfig`]; role grants made at runtime live as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryRbac {
    role_permissions: DashMap<String, BTreeSet<String>>,
    user_roles: DashMap<String, BTreeSet<String>>,
}

impl InMemoryRbac {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RbacConfig) -> Self {
        let store = Self::new();
        for (role, permissions) in &config.roles {
            store.set_role_permissions(role, permissions.iter().cloned());
        }
        for (user, roles) in &config.assignments {
            let mut assigned = store.user_roles.entry(user.clone()).or_default();
            assigned.extend(roles.iter().cloned());
        }
        store
    }

    /// Replace the permissions granted by `role`
    pub fn set_role_permissions(&self, role: &str, permissions: impl IntoIterator<Item = String>) {
        self.role_permissions.insert(role.to_string(), permissions.into_iter().collect());
    }
}

#[async_trait]
impl RbacStore for InMemoryRbac {
    async fn get_user_roles(&self, username: &str) -> Result<BTreeSet<String>> {
        Ok(self.user_roles.get(username).map(|roles| roles.clone()).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn add_role_for_user(&self, username: &str, role: &str) -> Result<()> {
        // The entry guard holds the shard lock, so concurrent grants serialize
        let inserted = self.user_roles.entry(username.to_string()).or_default().insert(role.to_string());
        debug!(inserted, "Role grant processed");
        Ok(())
    }

    async fn get_permissions_for_user(&self, username: &str) -> Result<Vec<String>> {
        // Copy the roles out before touching the second map
        let roles = self.get_user_roles(username).await?;

        let permissions: BTreeSet<String> = roles
            .iter()
            .filter_map(|role| self.role_permissions.get(role))
            .flat_map(|permissions| permissions.iter().cloned().collect::<Vec<_>>())
            .collect();

        Ok(permissions.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeMap, sync::Arc};

    fn seeded() -> InMemoryRbac {
        InMemoryRbac::from_config(&RbacConfig {
            roles: BTreeMap::from([
                ("admin".to_string(), vec!["topology.read".to_string(), "topology.write".to_string()]),
                ("operator".to_string(), vec!["topology.read".to_string(), "capture.write".to_string()]),
            ]),
            assignments: BTreeMap::from([("bob".to_string(), vec!["admin".to_string()])]),
        })
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_roles() {
        let rbac = seeded();
        assert!(rbac.get_user_roles("nobody").await.unwrap().is_empty());
        assert!(rbac.get_permissions_for_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_assignments() {
        let rbac = seeded();
        let roles = rbac.get_user_roles("bob").await.unwrap();
        assert_eq!(roles, BTreeSet::from(["admin".to_string()]));
        assert_eq!(
            rbac.get_permissions_for_user("bob").await.unwrap(),
            vec!["topology.read".to_string(), "topology.write".to_string()]
        );
    }

    #[tokio::test]
    async fn test_add_role_is_idempotent() {
        let rbac = seeded();
        rbac.add_role_for_user("alice", "operator").await.unwrap();
        rbac.add_role_for_user("alice", "operator").await.unwrap();

        let roles = rbac.get_user_roles("alice").await.unwrap();
        assert_eq!(roles, BTreeSet::from(["operator".to_string()]));
    }

    #[tokio::test]
    async fn test_permissions_are_merged_and_sorted() {
        let rbac = seeded();
        rbac.add_role_for_user("carol", "operator").await.unwrap();
        rbac.add_role_for_user("carol", "admin").await.unwrap();

        assert_eq!(
            rbac.get_permissions_for_user("carol").await.unwrap(),
            vec![
                "capture.write".to_string(),
                "topology.read".to_string(),
                "topology.write".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_role_without_permissions() {
        let rbac = seeded();
        rbac.add_role_for_user("dave", "guest").await.unwrap();
        assert!(rbac.get_permissions_for_user("dave").await.unwrap().is_empty());

        rbac.set_role_permissions("guest", ["topology.read".to_string()]);
        assert_eq!(rbac.get_permissions_for_user("dave").await.unwrap(), vec!["topology.read".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_grants_converge() {
        let rbac = Arc::new(seeded());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let rbac = rbac.clone();
            handles.push(tokio::spawn(async move { rbac.add_role_for_user("erin", "operator").await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(rbac.get_user_roles("erin").await.unwrap().len(), 1);
    }
}
