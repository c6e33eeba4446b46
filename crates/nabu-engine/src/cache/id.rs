use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Caller-chosen identifier of a cache entry.
///
/// Cheap to clone: segments and the access order hold copies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheId(Arc<str>);

impl CacheId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for CacheId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&CacheId> for CacheId {
    fn from(id: &CacheId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for CacheId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
