use std::fmt;

use serde::{Deserialize, Serialize};

/// A type-loading boundary.
///
/// The host mints one `ScopeId` per deployed version of its schema. Field
/// sets for the same object id may differ in shape between scopes, so each
/// scope owns an independent cache and only ever shares data with other
/// scopes through the on-disk field set.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The scope used when the host does not distinguish schema versions.
    pub fn default_scope() -> Self {
        Self("default".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::default_scope()
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.0)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
