use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use glob::{glob, Pattern};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{CacheEntry, CacheKey, CacheMeta};
use crate::table::RawTable;

const FILE_PREFIX: &str = "preact_";
const TABLE_SUFFIX: &str = ".parquet";
const META_SUFFIX: &str = ".meta.json";

/// Directory of cached tables, one Parquet file plus one JSON sidecar per key.
///
/// Writes go through a temp file in the same directory and are renamed into
/// place, table first and sidecar second, so a sidecar never describes a
/// table that was not completely written.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open the store at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, key.as_str(), TABLE_SUFFIX))
    }

    pub fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, key.as_str(), META_SUFFIX))
    }

    /// The cached entry for `key`, or `None` if no table was ever written.
    /// Never touches the network and never checks freshness.
    pub fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let table_path = self.table_path(key);
        if !table_path.is_file() {
            return Ok(None);
        }
        let table = read_parquet(&table_path)?;
        let meta = self.read_meta(key);
        debug!(%key, rows = table.num_rows(), has_meta = meta.is_some(), "cache read");
        Ok(Some(CacheEntry {
            key: key.clone(),
            table,
            meta,
        }))
    }

    /// Sidecar for `key`; a corrupt sidecar is logged and treated as absent.
    pub fn read_meta(&self, key: &CacheKey) -> Option<CacheMeta> {
        let path = self.meta_path(key);
        let file = File::open(&path).ok()?;
        match serde_json::from_reader(file) {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable cache metadata");
                None
            }
        }
    }

    pub fn write(&self, key: &CacheKey, table: &RawTable, meta: &CacheMeta) -> Result<()> {
        let table_path = self.table_path(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        {
            let props = WriterProperties::builder()
                .set_compression(Compression::SNAPPY)
                .build();
            let buf_writer = BufWriter::new(tmp.as_file_mut());
            let mut writer = ArrowWriter::try_new(buf_writer, table.batch().schema(), Some(props))
                .context("creating ArrowWriter for cached table")?;
            writer.write(table.batch()).context("writing cached table")?;
            writer.close().context("closing ArrowWriter for cached table")?;
        }
        tmp.persist(&table_path)
            .with_context(|| format!("renaming temp file to {}", table_path.display()))?;

        let meta_path = self.meta_path(key);
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), meta)
            .context("serializing cache metadata")?;
        tmp.write_all(b"\n")?;
        tmp.persist(&meta_path)
            .with_context(|| format!("renaming temp file to {}", meta_path.display()))?;

        debug!(%key, rows = table.num_rows(), "cache written");
        Ok(())
    }

    /// Every key that has a cached table, sorted, with its sidecar if readable.
    pub fn entries(&self) -> Result<Vec<(CacheKey, Option<CacheMeta>)>> {
        let pattern = format!(
            "{}/{}*{}",
            Pattern::escape(&self.dir.display().to_string()),
            FILE_PREFIX,
            TABLE_SUFFIX
        );
        let mut out = Vec::new();
        for entry in glob(&pattern).context("invalid glob pattern for cache entries")? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = ?e, "cannot read cache entry");
                    continue;
                }
            };
            let key = path
                .file_name()
                .and_then(|f| f.to_str())
                .and_then(|f| f.strip_prefix(FILE_PREFIX))
                .and_then(|f| f.strip_suffix(TABLE_SUFFIX))
                .and_then(CacheKey::parse);
            if let Some(key) = key {
                let meta = self.read_meta(&key);
                out.push((key, meta));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).with_context(|| {
        format!(
            "failed to create RecordBatchReaderBuilder for `{}`",
            path.display()
        )
    })?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .with_context(|| format!("failed to build RecordBatchReader for `{}`", path.display()))?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("error reading RecordBatch from `{}`", path.display()))?;
    let batch = concat_batches(&schema, &batches)?;
    Ok(RawTable::from_batch(batch)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::year::SchoolYear;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn sample_table() -> RawTable {
        RawTable::from_rows(
            &["DISTRICT_CODE", "AVERAGE_SCORE"],
            &[vec![Some("6174"), Some("18.2")], vec![Some("100"), None]],
        )
        .unwrap()
    }

    fn year_key(y: i32) -> CacheKey {
        CacheKey::Year(SchoolYear::from_start_year(y))
    }

    #[test]
    fn missing_key_reads_none() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::new(tmp.path().join("cache")).unwrap();
        assert!(store.read(&CacheKey::Latest).unwrap().is_none());
    }

    #[test]
    fn write_then_read_returns_table_and_meta() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::new(tmp.path()).unwrap();
        let key = year_key(2023);
        let table = sample_table();
        let meta = CacheMeta::now("https://example.test/a.zip", "a.zip", table.num_rows());

        store.write(&key, &table, &meta).unwrap();
        let entry = store.read(&key).unwrap().unwrap();

        assert_eq!(entry.key, key);
        assert_eq!(entry.table.column_names(), table.column_names());
        assert_eq!(entry.table.value(0, "AVERAGE_SCORE"), Some("18.2"));
        assert_eq!(entry.table.value(1, "DISTRICT_CODE"), Some("100"));
        assert_eq!(entry.table.value(1, "AVERAGE_SCORE"), None);
        assert_eq!(entry.meta, Some(meta));
        assert!(store.table_path(&key).ends_with("preact_2023-24.parquet"));
        assert!(store.meta_path(&key).is_file());
    }

    #[test]
    fn table_is_written_before_sidecar() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::new(tmp.path()).unwrap();
        let key = year_key(2022);
        store.write(&key, &sample_table(), &CacheMeta::now("u", "f", 2)).unwrap();

        let table_mtime = fs::metadata(store.table_path(&key)).unwrap().modified().unwrap();
        let meta_mtime = fs::metadata(store.meta_path(&key)).unwrap().modified().unwrap();
        assert!(table_mtime <= meta_mtime);
    }

    #[test]
    fn freshness_expires_exactly_at_ttl() {
        let ttl = Duration::days(30);
        let now = Utc::now();
        let entry = CacheEntry {
            key: CacheKey::Latest,
            table: sample_table(),
            meta: Some(CacheMeta {
                cached_at: now,
                source_url: String::new(),
                record_count: 2,
                filename: String::new(),
            }),
        };

        assert!(entry.is_fresh_at(ttl, now));
        assert!(entry.is_fresh_at(ttl, now + ttl - Duration::seconds(1)));
        assert!(!entry.is_fresh_at(ttl, now + ttl));
        assert!(!entry.is_fresh_at(ttl, now + ttl + Duration::days(1)));
    }

    #[test]
    fn table_without_sidecar_is_returned_but_never_fresh() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::new(tmp.path()).unwrap();
        let meta = CacheMeta::now("u", "f", 2);
        store.write(&CacheKey::Latest, &sample_table(), &meta).unwrap();
        fs::remove_file(store.meta_path(&CacheKey::Latest)).unwrap();

        let entry = store.read(&CacheKey::Latest).unwrap().unwrap();
        assert!(entry.meta.is_none());
        assert!(!entry.is_fresh(Duration::days(30)));
        assert_eq!(entry.table.num_rows(), 2);
    }

    #[test]
    fn corrupt_sidecar_is_ignored() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::new(tmp.path()).unwrap();
        let key = year_key(2021);
        store.write(&key, &sample_table(), &CacheMeta::now("u", "f", 2)).unwrap();
        fs::write(store.meta_path(&key), "{ not json").unwrap();

        let entry = store.read(&key).unwrap().unwrap();
        assert!(entry.meta.is_none());
    }

    #[test]
    fn rewrite_replaces_table_and_meta() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::new(tmp.path()).unwrap();
        let key = year_key(2022);
        store.write(&key, &sample_table(), &CacheMeta::now("old", "old.zip", 2)).unwrap();

        let newer = RawTable::from_rows(&["DISTRICT_CODE"], &[vec![Some("1")]]).unwrap();
        store.write(&key, &newer, &CacheMeta::now("new", "new.zip", 1)).unwrap();

        let entry = store.read(&key).unwrap().unwrap();
        assert_eq!(entry.table.num_rows(), 1);
        assert_eq!(entry.table.column_names(), vec!["DISTRICT_CODE"]);
        assert_eq!(entry.meta.unwrap().filename, "new.zip");
    }

    #[test]
    fn entries_lists_keys_in_order() {
        let tmp = tempdir().unwrap();
        let store = CacheStore::new(tmp.path()).unwrap();
        for key in [CacheKey::Latest, year_key(2021), year_key(2020)] {
            store.write(&key, &sample_table(), &CacheMeta::now("u", "f", 2)).unwrap();
        }
        fs::write(tmp.path().join("unrelated.parquet"), b"x").unwrap();

        let keys: Vec<_> = store.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![year_key(2020), year_key(2021), CacheKey::Latest]);
    }
}
