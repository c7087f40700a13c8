//! Cache key construction
//!
//! Every cached entity has two keys: the positive key `prefix:{id}` holding the
//! serialized value, and the negative key `prefix:NotFound:{id}` marking a
//! lookup that resolved to "not found". Both are always invalidated together.

use crate::constants::NEGATIVE_CACHE_SEGMENT;
use std::fmt;
use std::time::Duration;

/// Logical cache key for one entity identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix: &'static str,
    id: String,
}

impl CacheKey {
    pub fn new(prefix: &'static str, id: impl ToString) -> Self {
        Self {
            prefix,
            id: id.to_string(),
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key holding the cached value
    pub fn positive(&self) -> String {
        format!("{}:{}", self.prefix, self.id)
    }

    /// Key marking the entity as absent
    pub fn negative(&self) -> String {
        format!("{}:{}:{}", self.prefix, NEGATIVE_CACHE_SEGMENT, self.id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.positive())
    }
}

/// Positive and negative TTL for one kind of cached entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub positive: Duration,
    pub negative: Duration,
}

impl CacheTtl {
    pub fn from_secs(positive: u64, negative: u64) -> Self {
        Self {
            positive: Duration::from_secs(positive),
            negative: Duration::from_secs(negative),
        }
    }
}
