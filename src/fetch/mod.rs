// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use std::{future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

use crate::{config::Config, error::FetchError, year::SchoolYear};

pub mod urls;
pub mod zips;

pub use urls::{list_available, RemoteFile};

/// The publisher, as seen by the pipeline.
pub trait Remote {
    /// Body of an HTML listing page (short timeout).
    fn listing(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>>;

    /// Raw bytes of a published archive (long timeout).
    fn download(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

/// Where the published files live.
#[derive(Debug, Clone)]
pub struct Sources {
    pub listing_url: Url,
    pub download_base: Url,
    pub file_family: String,
}

impl Sources {
    pub fn from_config(config: &Config) -> Result<Self> {
        let listing_url = Url::parse(&config.listing_url)
            .with_context(|| format!("parsing listing URL {}", config.listing_url))?;
        let mut base = config.download_base.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let download_base =
            Url::parse(&base).with_context(|| format!("parsing download base {}", base))?;
        Ok(Self {
            listing_url,
            download_base,
            file_family: config.file_family.clone(),
        })
    }

    /// The archive published for `year`, derived from the naming convention.
    pub fn year_file(&self, year: &SchoolYear) -> Result<RemoteFile, FetchError> {
        let filename = format!("{}_{}.zip", self.file_family, year);
        let url = self.download_base.join(&filename)?;
        Ok(RemoteFile { filename, url })
    }
}

/// `Remote` over HTTP, with per-request timeouts and optional retries.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    listing_timeout: Duration,
    download_timeout: Duration,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl HttpRemote {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            listing_timeout: config.listing_timeout(),
            download_timeout: config.download_timeout(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    async fn send(&self, url: &Url, timeout: Duration) -> Result<Response, FetchError> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    async fn get_text_core(&self, url: &Url) -> Result<String, FetchError> {
        self.send(url, self.listing_timeout)
            .await?
            .text()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })
    }

    async fn get_bytes_core(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .send(url, self.download_timeout)
            .await?
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }

    async fn with_retry<T, Fut>(
        &self,
        url: &Url,
        mut op: impl FnMut() -> Fut,
    ) -> Result<T, FetchError>
    where
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempts = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = backoff_delay_ms(self.retry_backoff_ms, attempts);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    if attempts > 0 {
                        error!(%url, error = %e, "Exhausted retries");
                    }
                    return Err(e);
                }
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`,
/// saturating instead of overflowing.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

impl Remote for HttpRemote {
    async fn listing(&self, url: &Url) -> Result<String, FetchError> {
        self.with_retry(url, || self.get_text_core(url)).await
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        self.with_retry(url, || self.get_bytes_core(url)).await
    }
}
