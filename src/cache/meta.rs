use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::CacheKey;
use crate::table::RawTable;

/// Sidecar record describing where a cached table came from.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CacheMeta {
    pub cached_at: DateTime<Utc>,
    pub source_url: String,
    pub record_count: usize,
    pub filename: String,
}

impl CacheMeta {
    /// Metadata stamped with the current time.
    pub fn now(
        source_url: impl Into<String>,
        filename: impl Into<String>,
        record_count: usize,
    ) -> Self {
        Self {
            cached_at: Utc::now(),
            source_url: source_url.into(),
            record_count,
            filename: filename.into(),
        }
    }

    pub fn is_fresh_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.cached_at) < ttl
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub table: RawTable,
    /// `None` when the sidecar is missing or unreadable; such an entry is
    /// only ever served as stale data.
    pub meta: Option<CacheMeta>,
}

impl CacheEntry {
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(ttl, Utc::now())
    }

    pub fn is_fresh_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.meta.as_ref().is_some_and(|m| m.is_fresh_at(ttl, now))
    }
}
