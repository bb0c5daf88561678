//! Page sources: where rendered HTML comes from.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, ScrapeError};

use super::locator::LocatorChain;

/// Something that can produce a rendered HTML snapshot for a URL.
#[async_trait(?Send)]
pub trait PageSource {
    /// Rendered HTML of `url`. `ready` matches once the page has rendered its
    /// part data; sources that render may wait (bounded) for it.
    async fn fetch(&mut self, url: &str, ready: &LocatorChain) -> Result<String>;

    /// Start over with a fresh session before the next URL.
    async fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release any held resources. Called on every exit path of a run.
    async fn close(&mut self) {}
}

/// Previously saved page snapshots keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    pages: HashMap<String, PathBuf>,
}

impl SnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a saved snapshot for `url`.
    pub fn insert(&mut self, url: impl Into<String>, path: impl Into<PathBuf>) {
        self.pages.insert(url.into(), path.into());
    }

    /// Source over files, each file's path doubling as its URL.
    pub fn from_files(files: &[PathBuf]) -> (Self, Vec<String>) {
        let mut source = Self::new();
        let urls = files
            .iter()
            .map(|path| {
                let url = path.display().to_string();
                source.insert(url.clone(), path.clone());
                url
            })
            .collect();
        (source, urls)
    }
}

#[async_trait(?Send)]
impl PageSource for SnapshotSource {
    async fn fetch(&mut self, url: &str, _ready: &LocatorChain) -> Result<String> {
        let path = self.pages.get(url).ok_or_else(|| ScrapeError::Navigation {
            url: url.to_string(),
            reason: "no saved snapshot".to_string(),
        })?;
        debug!("Reading snapshot {} for {}", path.display(), url);
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: format!("{}: {}", path.display(), e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_registered_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.html");
        std::fs::write(&path, "<html>ok</html>").unwrap();

        let mut source = SnapshotSource::new();
        source.insert("https://x/p", &path);
        let ready = LocatorChain::new("ready", Vec::new());

        assert_eq!(source.fetch("https://x/p", &ready).await.unwrap(), "<html>ok</html>");
        assert!(matches!(
            source.fetch("https://x/missing", &ready).await,
            Err(ScrapeError::Navigation { .. })
        ));
    }
}
