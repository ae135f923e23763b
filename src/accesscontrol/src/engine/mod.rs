//! Access control engine
//!
//! Loads permission snapshots on demand, evaluates permission expressions
//! against them and compiles fast scope checkers.

pub mod metrics;

pub use metrics::{AccessMetrics, MetricsCollector, Outcome};

use crate::checker::Checker;
use crate::config::AccessControlConfig;
use crate::error::{AccessControlError, Result, StoreError};
use crate::evaluator::Evaluator;
use crate::scope::{ScopeAttributeResolver, ScopeResolvers};
use crate::store::{PermissionOptions, PermissionStore};
use crate::types::{group_scopes_by_action, ActionScopes, Principal};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Access control decision engine
///
/// # Pipeline
///
/// ```text
/// evaluate → load snapshot if absent → evaluator on raw scopes ── true ──→ allow
///                                              │ false
///                                              ↓
///                                 mutate scopes via resolvers ── no resolver ──→ deny
///                                              ↓
///                                 evaluator on resolved scopes → decision
/// ```
///
/// Resolvers are registered through `&mut self` while wiring; once the
/// engine is shared (e.g. behind an `Arc`) the registry can only be read.
pub struct AccessControl {
    /// Permission storage backend
    store: Arc<dyn PermissionStore>,

    /// Scope attribute resolvers by prefix
    resolvers: ScopeResolvers,

    /// Evaluation metrics
    metrics: Option<Arc<MetricsCollector>>,

    /// Engine configuration
    config: AccessControlConfig,
}

impl AccessControl {
    /// Create an engine over a permission store
    pub fn new(config: AccessControlConfig, store: Arc<dyn PermissionStore>) -> Self {
        let resolvers = ScopeResolvers::with_ttl(config.resolver_cache_ttl());

        let metrics = if config.enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        info!(
            "AccessControl initialized with enabled={}, resolver_cache_ttl={:?}, metrics={}",
            config.enabled,
            config.resolver_cache_ttl(),
            config.enable_metrics
        );

        Self {
            store,
            resolvers,
            metrics,
            config,
        }
    }

    /// Register a scope attribute resolver, replacing any previous one for the prefix
    pub fn register_scope_attribute_resolver<R>(
        &mut self,
        prefix: impl Into<String>,
        resolver: R,
    ) -> Result<()>
    where
        R: ScopeAttributeResolver + 'static,
    {
        let prefix = prefix.into();
        debug!("Registering scope resolver for prefix '{}'", prefix);
        self.resolvers.register(prefix, resolver)
    }

    /// Whether access control is disabled by configuration
    pub fn is_disabled(&self) -> bool {
        !self.config.enabled
    }

    /// Registered scope resolvers
    pub fn scope_resolvers(&self) -> &ScopeResolvers {
        &self.resolvers
    }

    /// Engine configuration
    pub fn config(&self) -> &AccessControlConfig {
        &self.config
    }

    /// Returns the principal's snapshot for its organization, loading it if absent
    ///
    /// A load always asks the store to bypass its cache. The fetched
    /// permissions are installed on the principal as a whole.
    pub async fn load_permissions(&self, principal: &mut Principal) -> Result<Arc<ActionScopes>> {
        if let Some(permissions) = principal.permissions() {
            return Ok(Arc::clone(permissions));
        }

        debug!(
            "Loading permissions for user {} in org {}",
            principal.user_id, principal.org_id
        );

        let fetch = self
            .store
            .get_user_permissions(principal, PermissionOptions { reload_cache: true });

        let fetched = match self.config.store_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, fetch).await.unwrap_or_else(|_| {
                Err(StoreError::new(format!(
                    "permission fetch timed out after {:?}",
                    timeout
                )))
            }),
            None => fetch.await,
        };

        let permissions = fetched.map_err(|e| {
            warn!(
                "Permission fetch failed for user {} in org {}: {}",
                principal.user_id, principal.org_id, e
            );
            AccessControlError::Store(e)
        })?;

        let snapshot = Arc::new(group_scopes_by_action(&permissions));
        principal.install_permissions(principal.org_id, Arc::clone(&snapshot));

        if let Some(metrics) = &self.metrics {
            metrics.record_permission_load();
        }

        Ok(snapshot)
    }

    /// Decide whether the principal satisfies the evaluator
    ///
    /// Denials are `Ok(false)`, including when no resolver covers the
    /// requested scopes. Only store failures and resolver failures other
    /// than a missing resolver are errors.
    pub async fn evaluate(&self, principal: &mut Principal, evaluator: &Evaluator) -> Result<bool> {
        let start = Instant::now();

        let result = self.evaluate_outcome(principal, evaluator).await;

        if let Some(metrics) = &self.metrics {
            let outcome = match &result {
                Ok(outcome) => *outcome,
                Err(_) => Outcome::Error,
            };
            metrics.record_outcome(outcome);
            metrics.record_latency(start.elapsed()).await;
        }

        result.map(|outcome| matches!(outcome, Outcome::FastPathGrant | Outcome::ResolvedGrant))
    }

    async fn evaluate_outcome(&self, principal: &mut Principal, evaluator: &Evaluator) -> Result<Outcome> {
        let permissions = self.load_permissions(principal).await?;

        // Wildcard grants are tested on unresolved scopes first: resolution
        // fails for resources that do not exist yet.
        if evaluator.evaluate(&permissions) {
            debug!("Granted {} to user {} on unresolved scopes", evaluator, principal.user_id);
            return Ok(Outcome::FastPathGrant);
        }

        let mutator = self.resolvers.mutator_for(principal.org_id);
        let resolved = match evaluator.mutate_scopes(&mutator).await {
            Ok(resolved) => resolved,
            Err(AccessControlError::ResolverNotFound(scope)) => {
                debug!(
                    "Denied {} to user {}: no resolver for {}",
                    evaluator, principal.user_id, scope
                );
                return Ok(Outcome::ResolverMiss);
            }
            Err(AccessControlError::Evaluation(msg)) => {
                return Err(AccessControlError::Evaluation(msg));
            }
            Err(e) => {
                return Err(AccessControlError::Evaluation(format!(
                    "resolving scopes of {}: {}",
                    evaluator, e
                )));
            }
        };

        if resolved.evaluate(&permissions) {
            debug!("Granted {} to user {} as {}", evaluator, principal.user_id, resolved);
            Ok(Outcome::ResolvedGrant)
        } else {
            debug!("Denied {} to user {}", evaluator, principal.user_id);
            Ok(Outcome::Denied)
        }
    }

    /// Compile a checker for `action` from the principal's loaded snapshot
    ///
    /// Never loads permissions: a principal without a snapshot for its
    /// organization gets a checker that denies everything.
    pub fn compile_checker<S: AsRef<str>>(
        &self,
        principal: &Principal,
        prefixes: &[S],
        action: &str,
    ) -> Checker {
        if !principal.has_permissions() {
            debug!(
                "No permissions loaded for user {} in org {}, checker for {} denies",
                principal.user_id, principal.org_id, action
            );
        }
        Checker::compile(principal.permissions().map(|p| p.as_ref()), prefixes, action)
    }

    /// Get evaluation metrics
    pub async fn metrics(&self) -> Option<AccessMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.get_metrics().await),
            None => None,
        }
    }

    /// Export evaluation metrics in Prometheus text format
    pub async fn export_metrics(&self) -> Option<String> {
        match &self.metrics {
            Some(metrics) => Some(metrics.export_prometheus().await),
            None => None,
        }
    }

    /// Reset evaluation metrics
    pub async fn reset_metrics(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.reset().await;
        }
    }
}
