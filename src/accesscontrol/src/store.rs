//! Permission store boundary

use crate::error::StoreError;
use crate::types::{OrgId, Permission, Principal, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Options for a permission fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionOptions {
    /// Bypass any cache the store keeps and read fresh permissions
    pub reload_cache: bool,
}

/// Source of a principal's flat permission list
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Fetch every permission the principal holds in its current organization
    async fn get_user_permissions(
        &self,
        principal: &Principal,
        options: PermissionOptions,
    ) -> std::result::Result<Vec<Permission>, StoreError>;
}

/// In-memory permission store implementation
pub struct InMemoryPermissionStore {
    permissions: Arc<RwLock<HashMap<(OrgId, UserId), Vec<Permission>>>>,
}

impl InMemoryPermissionStore {
    /// Create a new in-memory permission store
    pub fn new() -> Self {
        Self {
            permissions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Grant permissions to a user in an organization
    pub async fn grant(&self, org_id: OrgId, user_id: UserId, permissions: impl IntoIterator<Item = Permission>) {
        let mut store = self.permissions.write().await;
        store
            .entry((org_id, user_id))
            .or_default()
            .extend(permissions);
    }

    /// Remove every permission of a user in an organization
    pub async fn revoke_all(&self, org_id: OrgId, user_id: UserId) {
        let mut store = self.permissions.write().await;
        store.remove(&(org_id, user_id));
    }
}

impl Default for InMemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn get_user_permissions(
        &self,
        principal: &Principal,
        _options: PermissionOptions,
    ) -> std::result::Result<Vec<Permission>, StoreError> {
        let store = self.permissions.read().await;
        Ok(store
            .get(&(principal.org_id, principal.user_id))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryPermissionStore::new();
        store
            .grant(1, 10, [Permission::new("dashboards:read", "dashboards:*")])
            .await;

        let alice = Principal::new(10, "alice", 1);
        let permissions = store
            .get_user_permissions(&alice, PermissionOptions::default())
            .await
            .unwrap();
        assert_eq!(permissions, vec![Permission::new("dashboards:read", "dashboards:*")]);

        let other_org = Principal::new(10, "alice", 2);
        let permissions = store
            .get_user_permissions(&other_org, PermissionOptions { reload_cache: true })
            .await
            .unwrap();
        assert!(permissions.is_empty());

        store.revoke_all(1, 10).await;
        let permissions = store
            .get_user_permissions(&alice, PermissionOptions::default())
            .await
            .unwrap();
        assert!(permissions.is_empty());
    }
}
