// src/acquire/mod.rs

use chrono::Duration;
use tracing::{error, info, instrument, warn};

use crate::{
    cache::{CacheEntry, CacheKey, CacheMeta, CacheStore},
    error::FetchError,
    fetch::{list_available, zips::extract_first_csv, Remote, RemoteFile, Sources},
    table::RawTable,
    year::SchoolYear,
};

pub mod merge;

/// Decides between the cache and the publisher for one dataset.
pub struct Acquirer<R> {
    remote: R,
    cache: CacheStore,
    sources: Sources,
    ttl: Duration,
}

impl<R: Remote> Acquirer<R> {
    pub fn new(remote: R, cache: CacheStore, sources: Sources, ttl: Duration) -> Self {
        Self {
            remote,
            cache,
            sources,
            ttl,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Table for `year`, or for the newest published file when `year` is
    /// `None`. A fresh cache entry is served without touching the network
    /// unless `force_refresh`; a failed fetch falls back to whatever the
    /// cache holds, however old. `None` means no data could be found at all.
    #[instrument(
        level = "info",
        skip(self, year),
        fields(year = %year.map_or(CacheKey::LATEST, SchoolYear::as_str))
    )]
    pub async fn acquire(
        &self,
        year: Option<&SchoolYear>,
        force_refresh: bool,
    ) -> Option<RawTable> {
        let key = CacheKey::from(year);

        let target = match year {
            Some(year) => match self.sources.year_file(year) {
                Ok(file) => file,
                Err(e) => {
                    warn!(error = %e, "cannot derive download URL");
                    return self.stale(&key);
                }
            },
            None => match list_available(&self.remote, &self.sources).await.into_iter().next() {
                Some(file) => file,
                None => {
                    warn!("no published data files found");
                    return self.stale(&key);
                }
            },
        };

        let cached = self.read_cache(&key);
        if !force_refresh {
            if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(self.ttl)) {
                info!(
                    filename = entry.meta.as_ref().map_or("cache", |m| m.filename.as_str()),
                    "using cached data"
                );
                return Some(entry.table.clone());
            }
        }

        info!(filename = %target.filename, "downloading");
        match self.fetch(&target).await {
            Ok(table) => {
                let meta = CacheMeta::now(target.url.as_str(), &target.filename, table.num_rows());
                if let Err(e) = self.cache.write(&key, &table, &meta) {
                    error!(%key, error = %e, "failed to cache downloaded table");
                }
                info!(records = table.num_rows(), filename = %target.filename, "downloaded");
                Some(table)
            }
            Err(e) => {
                warn!(url = %target.url, error = %e, "fetch failed");
                match cached {
                    Some(entry) => {
                        info!(%key, "using stale cache");
                        Some(entry.table)
                    }
                    None => None,
                }
            }
        }
    }

    /// Download, unpack and parse one archive. Nothing is written here.
    async fn fetch(&self, target: &RemoteFile) -> Result<RawTable, FetchError> {
        let bytes = self.remote.download(&target.url).await?;
        let (member, csv) = extract_first_csv(&bytes, &target.filename)?;
        RawTable::from_csv(&csv).map_err(|source| FetchError::Parse { member, source })
    }

    fn read_cache(&self, key: &CacheKey) -> Option<CacheEntry> {
        match self.cache.read(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    fn stale(&self, key: &CacheKey) -> Option<RawTable> {
        let entry = self.read_cache(key)?;
        info!(%key, "using stale cache");
        Some(entry.table)
    }
}
