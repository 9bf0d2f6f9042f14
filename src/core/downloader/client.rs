use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::{Client, Url};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::core::error::{PkgError, PkgResult};
use crate::core::http::build_http_client;

/// Streams remote files to disk.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_default_client() -> PkgResult<Self> {
        Ok(Self::new(build_http_client()?))
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to exactly `dest`, creating parent directories.
    ///
    /// A partially written file is removed when the transfer fails.
    pub async fn download_file(&self, url: &str, dest: &Path) -> PkgResult<u64> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PkgError::io(parent, e))?;
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PkgError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let result = write_stream(response, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        let written = result?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }

    /// Download `url` into `dir`, naming the file after the last URL path
    /// segment. An existing name gets a `.1`, `.2`, ... suffix instead of
    /// being overwritten.
    pub async fn download_into(&self, url: &str, dir: &Path) -> PkgResult<PathBuf> {
        let name = file_name_from_url(url)
            .ok_or_else(|| PkgError::Other(format!("URL has no file name: {}", url)))?;
        let dest = disambiguate(dir, &name);

        info!("Fetching {} -> {:?}", url, dest);
        self.download_file(url, &dest).await?;
        Ok(dest)
    }
}

async fn write_stream(response: reqwest::Response, dest: &Path) -> PkgResult<u64> {
    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| PkgError::io(dest, e))?;

    let mut written = 0_u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk)
            .await
            .map_err(|e| PkgError::io(dest, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| PkgError::io(dest, e))?;
    Ok(written)
}

/// Last non-empty path segment of `url`.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// `dir/name`, or `dir/name.N` for the first free `N`.
pub fn disambiguate(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    (1_u32..)
        .map(|n| dir.join(format!("{}.{}", name, n)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
