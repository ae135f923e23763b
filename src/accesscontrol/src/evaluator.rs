//! Permission expression tree
//!
//! An [`Evaluator`] describes what a request needs: a single action on some
//! scopes, or combinations of those. It is tested against a principal's
//! permission snapshot and can produce a resolved copy of itself with every
//! scope rewritten by a [`ScopeMutator`].

use std::fmt;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{AccessControlError, Result};
use crate::scope::{self, ScopeMutator};
use crate::types::ActionScopes;

/// Boolean expression over action → scopes permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluator {
    /// The action is granted on at least one of the scopes
    ///
    /// `None` only requires the action. `Some` with an empty list never
    /// matches; it is what a scope resolving to nothing leaves behind.
    Permission {
        /// Action name
        action: String,
        /// Requested scopes
        scopes: Option<Vec<String>>,
    },

    /// Every child evaluator holds (vacuously true when empty)
    All(Vec<Evaluator>),

    /// At least one child evaluator holds (false when empty)
    Any(Vec<Evaluator>),
}

impl Evaluator {
    /// Requires `action` on at least one of `scopes`, or just `action` when no scopes are given
    pub fn permission<I, S>(action: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
        Self::Permission {
            action: action.into(),
            scopes: if scopes.is_empty() { None } else { Some(scopes) },
        }
    }

    /// Requires `action` regardless of scope
    pub fn action(action: impl Into<String>) -> Self {
        Self::Permission {
            action: action.into(),
            scopes: None,
        }
    }

    /// Requires every evaluator
    pub fn all(evaluators: impl IntoIterator<Item = Evaluator>) -> Self {
        Self::All(evaluators.into_iter().collect())
    }

    /// Requires any evaluator
    pub fn any(evaluators: impl IntoIterator<Item = Evaluator>) -> Self {
        Self::Any(evaluators.into_iter().collect())
    }

    /// Tests the expression against a permission snapshot
    pub fn evaluate(&self, permissions: &ActionScopes) -> bool {
        match self {
            Self::Permission { action, scopes } => {
                let Some(granted) = permissions.get(action) else {
                    return false;
                };
                match scopes {
                    None => true,
                    Some(targets) => targets.iter().any(|target| {
                        granted.iter().any(|scope| scope::matches(scope, target))
                    }),
                }
            }
            Self::All(evaluators) => evaluators.iter().all(|e| e.evaluate(permissions)),
            Self::Any(evaluators) => evaluators.iter().any(|e| e.evaluate(permissions)),
        }
    }

    /// Produces a copy with every scope replaced by its mutations
    ///
    /// Scopes no resolver covers are kept unchanged. The mutation fails with
    /// `ResolverNotFound` only when nothing in this expression could be
    /// resolved; any other mutator error is returned as is.
    pub fn mutate_scopes<'a>(
        &'a self,
        mutator: &'a dyn ScopeMutator,
    ) -> BoxFuture<'a, Result<Evaluator>> {
        async move {
            match self {
                Self::Permission { action, scopes: None } => {
                    Err(AccessControlError::ResolverNotFound(format!("{} has no scopes", action)))
                }
                Self::Permission { action, scopes: Some(targets) } => {
                    let mut resolved = false;
                    let mut mutated = Vec::with_capacity(targets.len());
                    for target in targets {
                        match mutator.mutate(target).await {
                            Ok(scopes) => {
                                resolved = true;
                                for scope in scopes {
                                    if !mutated.contains(&scope) {
                                        mutated.push(scope);
                                    }
                                }
                            }
                            Err(e) if e.is_resolver_not_found() => {
                                if !mutated.contains(target) {
                                    mutated.push(target.clone());
                                }
                            }
                            Err(e) => return Err(e),
                        }
                    }

                    if !resolved {
                        return Err(AccessControlError::ResolverNotFound(targets.join(", ")));
                    }

                    Ok(Self::Permission {
                        action: action.clone(),
                        scopes: Some(mutated),
                    })
                }
                Self::All(evaluators) => {
                    Ok(Self::All(mutate_children(evaluators, mutator).await?))
                }
                Self::Any(evaluators) => {
                    Ok(Self::Any(mutate_children(evaluators, mutator).await?))
                }
            }
        }
        .boxed()
    }
}

/// Mutates every child, keeping the unresolvable ones unchanged
async fn mutate_children(
    evaluators: &[Evaluator],
    mutator: &dyn ScopeMutator,
) -> Result<Vec<Evaluator>> {
    let mut resolved = false;
    let mut mutated = Vec::with_capacity(evaluators.len());
    for evaluator in evaluators {
        match evaluator.mutate_scopes(mutator).await {
            Ok(e) => {
                resolved = true;
                mutated.push(e);
            }
            Err(e) if e.is_resolver_not_found() => mutated.push(evaluator.clone()),
            Err(e) => return Err(e),
        }
    }

    if !resolved {
        return Err(AccessControlError::ResolverNotFound(format!(
            "none of {} evaluators could be resolved",
            evaluators.len()
        )));
    }
    Ok(mutated)
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, evaluators: &[Evaluator]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (idx, evaluator) in evaluators.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", evaluator)?;
    }
    write!(f, ")")
}

impl fmt::Display for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Permission { action, scopes: None } => write!(f, "{}", action),
            Self::Permission { action, scopes: Some(scopes) } => {
                write!(f, "{}[{}]", action, scopes.join(" "))
            }
            Self::All(evaluators) => write_list(f, "all", evaluators),
            Self::Any(evaluators) => write_list(f, "any", evaluators),
        }
    }
}
