//! Encoded audio fetching
//!
//! Resolves a source locator to raw bytes: `http(s)://` goes through reqwest,
//! `file://` URLs and bare paths are read with tokio.

use crate::error::{AudioError, Result};
use async_trait::async_trait;
use reqwest::Client;
use soul_core::AudioFetcher;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches encoded audio from URLs or local paths
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    http: Client,
}

impl SourceFetcher {
    /// Create a fetcher with reasonable HTTP defaults
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(60))
    }

    /// Create a fetcher with a custom whole-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("SoulLoudness/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }

    /// Fetch raw bytes for `source`
    pub async fn fetch_bytes(&self, source: &str) -> Result<Vec<u8>> {
        match Url::parse(source) {
            Ok(url) => match url.scheme() {
                "http" | "https" => self.fetch_http(url).await,
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|()| AudioError::UnsupportedScheme(source.to_string()))?;
                    Self::read_file(&path).await
                }
                // Windows drive letters parse as a one-letter scheme
                scheme if scheme.len() == 1 => Self::read_file(Path::new(source)).await,
                scheme => Err(AudioError::UnsupportedScheme(scheme.to_string())),
            },
            Err(_) => Self::read_file(&PathBuf::from(source)).await,
        }
    }

    async fn fetch_http(&self, url: Url) -> Result<Vec<u8>> {
        debug!(url = %url, "Fetching audio over HTTP");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AudioError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Fetched audio");
        Ok(bytes.to_vec())
    }

    async fn read_file(path: &Path) -> Result<Vec<u8>> {
        debug!(path = %path.display(), "Reading audio file");

        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AudioError::FileNotFound(path.display().to_string()))
            }
            Err(e) => Err(AudioError::Io(e)),
        }
    }
}

#[async_trait]
impl AudioFetcher for SourceFetcher {
    async fn fetch(&self, source: &str) -> soul_core::Result<Vec<u8>> {
        Ok(self.fetch_bytes(source).await?)
    }
}
