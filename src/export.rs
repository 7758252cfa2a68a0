use anyhow::{Context, Result};
use std::{fs, io::Write, path::Path};
use tempfile::NamedTempFile;
use tracing::info;

use crate::analysis::DistrictSummary;

/// Write `summary` as pretty JSON to `path`, creating parent directories.
/// The file is written to a sibling temp file and renamed into place.
pub fn write_summary(summary: &DistrictSummary, path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), summary).context("serializing summary")?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming temp file to {}", path.display()))?;
    info!(path = %path.display(), "summary exported");
    Ok(())
}
