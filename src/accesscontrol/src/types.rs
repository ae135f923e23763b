//! Core access control types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Organization identifier
pub type OrgId = i64;

/// User identifier
pub type UserId = i64;

/// Granted scopes keyed by action name
///
/// Order and duplicates inside a scope list carry no meaning.
pub type ActionScopes = HashMap<String, Vec<String>>;

/// A single granted permission as returned by a permission store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Action name (e.g., "dashboards:read")
    pub action: String,

    /// Scope the action applies to (e.g., "dashboards:uid:abc123"), empty for unscoped actions
    #[serde(default)]
    pub scope: String,
}

impl Permission {
    /// Create a new permission
    pub fn new(action: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            scope: scope.into(),
        }
    }
}

/// Group a flat permission list into the action → scopes snapshot shape
pub fn group_scopes_by_action(permissions: &[Permission]) -> ActionScopes {
    let mut grouped = ActionScopes::new();
    for permission in permissions {
        grouped
            .entry(permission.action.clone())
            .or_default()
            .push(permission.scope.clone());
    }
    grouped
}

/// Signed-in principal for the lifetime of one request
///
/// Permission snapshots are installed whole, one per organization, and
/// shared read-only through `Arc`. A snapshot is never edited in place:
/// reloading replaces the `Arc`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    /// User identifier
    pub user_id: UserId,

    /// Login name
    pub login: String,

    /// Organization the principal is currently acting in
    pub org_id: OrgId,

    /// Loaded permission snapshots by organization
    permissions: HashMap<OrgId, Arc<ActionScopes>>,
}

impl Principal {
    /// Create a principal with no loaded permissions
    pub fn new(user_id: UserId, login: impl Into<String>, org_id: OrgId) -> Self {
        Self {
            user_id,
            login: login.into(),
            org_id,
            permissions: HashMap::new(),
        }
    }

    /// Attach a snapshot for the current organization
    pub fn with_permissions(mut self, permissions: ActionScopes) -> Self {
        self.install_permissions(self.org_id, Arc::new(permissions));
        self
    }

    /// Snapshot for the current organization, if loaded
    pub fn permissions(&self) -> Option<&Arc<ActionScopes>> {
        self.permissions.get(&self.org_id)
    }

    /// Snapshot for an arbitrary organization, if loaded
    pub fn permissions_for(&self, org_id: OrgId) -> Option<&Arc<ActionScopes>> {
        self.permissions.get(&org_id)
    }

    /// Whether a snapshot is loaded for the current organization
    pub fn has_permissions(&self) -> bool {
        self.permissions.contains_key(&self.org_id)
    }

    /// Replace the snapshot for an organization as a whole
    pub fn install_permissions(&mut self, org_id: OrgId, permissions: Arc<ActionScopes>) {
        self.permissions.insert(org_id, permissions);
    }

    /// Drop every loaded snapshot
    pub fn clear_permissions(&mut self) {
        self.permissions.clear();
    }
}
