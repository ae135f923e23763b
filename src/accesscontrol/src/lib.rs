//! # CretoAI Access Control
//!
//! Scope-based access control decisions for signed-in principals.
//!
//! ## Features
//!
//! - **Lazy permission snapshots** loaded once per request from a [`PermissionStore`]
//! - **Two-phase evaluation**: literal scopes first, resolver-rewritten scopes second
//! - **Scope attribute resolvers** keyed by scope prefix, with TTL caching
//! - **Compiled checkers** for fast wildcard-aware filtering of listings
//!
//! ## Example
//!
//! ```rust
//! use cretoai_accesscontrol::{
//!     resolver_fn, AccessControl, AccessControlConfig, Evaluator, InMemoryPermissionStore,
//!     Permission, Principal,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryPermissionStore::new());
//!     store
//!         .grant(1, 42, [Permission::new("dashboards:read", "dashboards:uid:abc")])
//!         .await;
//!
//!     let mut access = AccessControl::new(AccessControlConfig::default(), store);
//!     access.register_scope_attribute_resolver(
//!         "dashboards:id:",
//!         resolver_fn(|_, _| Ok(vec!["dashboards:uid:abc".to_string()])),
//!     )?;
//!
//!     let mut alice = Principal::new(42, "alice", 1);
//!     let evaluator = Evaluator::permission("dashboards:read", ["dashboards:id:7"]);
//!
//!     if access.evaluate(&mut alice, &evaluator).await? {
//!         println!("Access granted!");
//!     }
//!
//!     let checker = access.compile_checker(&alice, &["dashboards:uid"], "dashboards:read");
//!     assert!(checker.check(&["dashboards:uid:abc"]));
//!
//!     Ok(())
//! }
//! ```

pub mod checker;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod scope;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use checker::Checker;
pub use config::AccessControlConfig;
pub use engine::{AccessControl, AccessMetrics};
pub use error::{AccessControlError, Result, StoreError};
pub use evaluator::Evaluator;
pub use scope::{resolver_fn, ScopeAttributeResolver, ScopeMutator, ScopeResolvers, Wildcards};
pub use store::{InMemoryPermissionStore, PermissionOptions, PermissionStore};
pub use types::{group_scopes_by_action, ActionScopes, OrgId, Permission, Principal, UserId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
