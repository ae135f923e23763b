//! Scope matching, wildcard derivation and scope attribute resolution
//!
//! # Examples
//!
//! ```
//! use cretoai_accesscontrol::scope::{matches, Wildcards};
//!
//! assert!(matches("dashboards:*", "dashboards:uid:abc"));
//!
//! let wildcards = Wildcards::from_prefixes(&["dashboards:uid"]);
//! assert!(wildcards.contains("dashboards:*"));
//! assert!(wildcards.contains("*"));
//! ```

mod types;
mod resolver;

#[cfg(test)]
mod tests;

pub use types::{is_wildcard, matches, scope_prefix, Wildcards, SEPARATOR, WILDCARD};
pub use resolver::{
    resolver_fn, CacheStats, FnResolver, ScopeAttributeMutator, ScopeAttributeResolver,
    ScopeMutator, ScopeResolvers, DEFAULT_CACHE_TTL,
};
