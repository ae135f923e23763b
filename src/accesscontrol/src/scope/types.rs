//! Scope string helpers and wildcard derivation
//!
//! Scopes are colon-separated strings such as `dashboards:uid:abc123`.
//! A granted scope ending in `*` at a segment boundary covers every scope
//! sharing its prefix:
//! - `*` covers everything
//! - `dashboards:*` covers `dashboards:uid:abc123`
//! - `dashboards:uid:*` covers `dashboards:uid:abc123`

/// Scope separator
pub const SEPARATOR: char = ':';

/// Universal wildcard scope
pub const WILDCARD: &str = "*";

/// Number of leading segments that make up a scope prefix
const MAX_PREFIX_PARTS: usize = 2;

/// Returns the resolver prefix of a scope
///
/// Scopes with more than two segments are cut after the second one and keep
/// the trailing separator; shorter scopes are returned unchanged.
///
/// ```
/// use cretoai_accesscontrol::scope::scope_prefix;
///
/// assert_eq!(scope_prefix("dashboards:uid:abc"), "dashboards:uid:");
/// assert_eq!(scope_prefix("dashboards:uid"), "dashboards:uid");
/// ```
pub fn scope_prefix(scope: &str) -> String {
    let parts: Vec<&str> = scope.split(SEPARATOR).collect();
    if parts.len() > MAX_PREFIX_PARTS {
        let mut prefix = parts[..MAX_PREFIX_PARTS].join(":");
        prefix.push(SEPARATOR);
        prefix
    } else {
        scope.to_string()
    }
}

/// Whether a scope is a wildcard at a segment boundary (`*` or `...:*`)
pub fn is_wildcard(scope: &str) -> bool {
    scope == WILDCARD || scope.ends_with(":*")
}

/// Whether a granted scope covers a target scope
///
/// A trailing `*` makes the granted scope a prefix match; otherwise the two
/// must be equal. Granted scopes with a `*` anywhere else never match.
pub fn matches(granted: &str, target: &str) -> bool {
    if granted.is_empty() {
        return false;
    }

    match granted.strip_suffix('*') {
        Some(prefix) => !prefix.contains('*') && target.starts_with(prefix),
        None => !granted.contains('*') && granted == target,
    }
}

/// Ordered set of wildcard scopes derived from scope prefixes
///
/// Always holds the universal wildcard `*`, followed by `<segment>:*` for
/// every segment of every prefix, in input order without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcards {
    scopes: Vec<String>,
}

impl Wildcards {
    /// Builds the wildcard set for the given prefixes
    pub fn from_prefixes<S: AsRef<str>>(prefixes: &[S]) -> Self {
        let mut wildcards = Self {
            scopes: vec![WILDCARD.to_string()],
        };

        for prefix in prefixes {
            for segment in prefix.as_ref().split(SEPARATOR) {
                wildcards.insert(format!("{}:*", segment));
            }
        }

        wildcards
    }

    fn insert(&mut self, scope: String) {
        if !self.scopes.contains(&scope) {
            self.scopes.push(scope);
        }
    }

    /// Whether the scope is literally one of the wildcards
    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.iter().any(|wildcard| wildcard == scope)
    }

    /// Iterates the wildcards in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    /// Number of wildcards
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always false, the universal wildcard is always present
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
