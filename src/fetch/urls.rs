// src/fetch/urls.rs
use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use super::{Remote, Sources};

/// A published archive: its bare filename and where to download it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub filename: String,
    pub url: Url,
}

/// Pull the dataset archives out of a listing page, newest-looking first.
///
/// Links are kept when they end in `.zip` and contain `family`; relative
/// hrefs are resolved against `base`. Ordering is descending by filename,
/// which the publisher's `<family>_<YYYY-YY>.zip` convention makes
/// descending by year.
pub fn parse_listing(html: &str, base: &Url, family: &str) -> Vec<RemoteFile> {
    let selector =
        Selector::parse(r#"a[href$=".zip"]"#).expect("CSS selector for ZIP links should be valid");

    let mut files: Vec<RemoteFile> = Html::parse_document(html)
        .select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .filter(|href| href.contains(family))
        .filter_map(|href| base.join(href).ok())
        .filter_map(|url| {
            let filename = url.path_segments()?.last()?.to_string();
            (!filename.is_empty()).then_some(RemoteFile { filename, url })
        })
        .collect();

    files.sort_by(|a, b| b.filename.cmp(&a.filename));
    files.dedup_by(|a, b| a.filename == b.filename);
    files
}

/// Ask the publisher which archives exist. Any failure is logged and
/// reported as "nothing published"; callers fall back to the cache.
pub async fn list_available<R: Remote>(remote: &R, sources: &Sources) -> Vec<RemoteFile> {
    match remote.listing(&sources.listing_url).await {
        Ok(html) => {
            let files = parse_listing(&html, &sources.listing_url, &sources.file_family);
            info!(count = files.len(), "found published files");
            files
        }
        Err(e) => {
            warn!(url = %sources.listing_url, error = %e, "error listing files");
            Vec::new()
        }
    }
}
