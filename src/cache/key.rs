use std::fmt;

use crate::year::SchoolYear;

/// Slot a cached table lives under: one per school year, plus the table
/// auto-detected from the publisher's listing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Year(SchoolYear),
    Latest,
}

impl CacheKey {
    pub const LATEST: &'static str = "latest";

    pub fn as_str(&self) -> &str {
        match self {
            CacheKey::Year(year) => year.as_str(),
            CacheKey::Latest => Self::LATEST,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            Self::LATEST => Some(CacheKey::Latest),
            other => SchoolYear::parse(other).map(CacheKey::Year),
        }
    }
}

impl From<Option<&SchoolYear>> for CacheKey {
    fn from(year: Option<&SchoolYear>) -> Self {
        year.cloned().map_or(CacheKey::Latest, CacheKey::Year)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
