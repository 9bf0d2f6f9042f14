// ─── Fetcher ───
// Turns a module name or URL into a local file inside a scratch directory.

pub mod strategy;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::core::downloader::Downloader;
use crate::core::error::{PkgError, PkgResult};

pub use strategy::{DownloadStrategy, UrlTemplateStrategy, NAME_PLACEHOLDER};

/// Ordered chain of download strategies; the first hit stops the chain.
#[derive(Clone, Default)]
pub struct Fetcher {
    strategies: Vec<Arc<dyn DownloadStrategy>>,
}

impl Fetcher {
    pub fn new(strategies: Vec<Arc<dyn DownloadStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn push(&mut self, strategy: Arc<dyn DownloadStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    #[instrument(skip(self, scratch))]
    pub async fn fetch(&self, module: &str, scratch: &Path) -> PkgResult<PathBuf> {
        for strategy in &self.strategies {
            match strategy.fetch(module, scratch).await {
                Ok(Some(path)) => {
                    info!("'{}' fetched by {} -> {:?}", module, strategy.name(), path);
                    return Ok(path);
                }
                Ok(None) => {}
                // A failing strategy counts as declined.
                Err(e) => warn!("Strategy {} failed for '{}': {}", strategy.name(), module, e),
            }
        }

        Err(PkgError::Fetch {
            module: module.to_string(),
            reason: if self.strategies.is_empty() {
                "no download strategies configured".into()
            } else {
                format!("all {} download strategies declined", self.strategies.len())
            },
        })
    }
}

/// Direct download of a URL into `scratch`.
pub async fn fetch_url(downloader: &Downloader, url: &str, scratch: &Path) -> PkgResult<PathBuf> {
    downloader.download_into(url, scratch).await
}
