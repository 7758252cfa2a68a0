use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

use crate::error::FetchError;

/// Return `(member name, contents)` of the first `.csv` member of an
/// in-memory ZIP archive, in archive order. `filename` only labels errors.
pub fn extract_first_csv(bytes: &[u8], filename: &str) -> Result<(String, Vec<u8>), FetchError> {
    let archive_err = |source| FetchError::Archive {
        filename: filename.to_string(),
        source,
    };
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_err)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(archive_err)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.to_lowercase().ends_with(".csv") {
            continue;
        }

        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|source| FetchError::Member {
                filename: filename.to_string(),
                member: name.clone(),
                source,
            })?;
        debug!(archive = filename, member = %name, bytes = buf.len(), "extracted member");
        return Ok((name, buf));
    }

    Err(FetchError::NoCsvMember(filename.to_string()))
}
