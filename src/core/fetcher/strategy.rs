use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::core::downloader::Downloader;
use crate::core::error::PkgResult;

/// A symbolic lookup that can turn a bare module name into a local file.
///
/// `Ok(None)` means the strategy declined; the next one is tried.
#[async_trait]
pub trait DownloadStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, module: &str, scratch: &Path) -> PkgResult<Option<PathBuf>>;
}

/// Placeholder substituted with the module name in URL templates.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Tries each configured URL template in order.
pub struct UrlTemplateStrategy {
    templates: Vec<String>,
    downloader: Downloader,
}

impl UrlTemplateStrategy {
    pub fn new(templates: Vec<String>, downloader: Downloader) -> Self {
        Self {
            templates,
            downloader,
        }
    }

    pub fn urls_for(&self, module: &str) -> Vec<String> {
        self.templates
            .iter()
            .map(|template| template.replace(NAME_PLACEHOLDER, module))
            .collect()
    }
}

#[async_trait]
impl DownloadStrategy for UrlTemplateStrategy {
    fn name(&self) -> &str {
        "url-template"
    }

    async fn fetch(&self, module: &str, scratch: &Path) -> PkgResult<Option<PathBuf>> {
        for url in self.urls_for(module) {
            match self.downloader.download_into(&url, scratch).await {
                Ok(path) => {
                    debug!("'{}' fetched from {}", module, url);
                    return Ok(Some(path));
                }
                Err(e) => warn!("'{}' not available at {}: {}", module, url, e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{local_client, StaticServer};

    #[test]
    fn templates_substitute_every_placeholder() {
        let strategy = UrlTemplateStrategy::new(
            vec![
                "https://a.example/{name}.el".into(),
                "https://b.example/{name}/{name}.tar.gz".into(),
            ],
            Downloader::new(local_client()),
        );
        assert_eq!(
            strategy.urls_for("foo"),
            vec![
                "https://a.example/foo.el".to_string(),
                "https://b.example/foo/foo.tar.gz".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn first_reachable_template_wins() {
        let server = StaticServer::start(vec![
            ("/b/foo.el", 200, b";; from b".to_vec()),
            ("/c/foo.el", 200, b";; from c".to_vec()),
        ])
        .await;
        let strategy = UrlTemplateStrategy::new(
            vec![
                server.url("/a/{name}.el"),
                server.url("/b/{name}.el"),
                server.url("/c/{name}.el"),
            ],
            Downloader::new(local_client()),
        );
        let scratch = tempfile::tempdir().unwrap();

        let path = strategy.fetch("foo", scratch.path()).await.unwrap().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b";; from b");
    }

    #[tokio::test]
    async fn exhausted_templates_decline() {
        let server = StaticServer::start(vec![]).await;
        let strategy = UrlTemplateStrategy::new(
            vec![server.url("/{name}.el")],
            Downloader::new(local_client()),
        );
        let scratch = tempfile::tempdir().unwrap();

        assert!(strategy.fetch("foo", scratch.path()).await.unwrap().is_none());
    }
}
