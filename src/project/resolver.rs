//! Content resolvers

use std::cell::Cell;
use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use url::Url;

/// Fetches document text for a resolved uri
#[async_trait(?Send)]
pub trait ContentResolver {
    async fn resolve(&self, uri: &str) -> Result<String>;
}

/// Reads local paths and `file://` uris
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

#[async_trait(?Send)]
impl ContentResolver for FsResolver {
    async fn resolve(&self, uri: &str) -> Result<String> {
        let path = match Url::parse(uri) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| anyhow!("not a local file uri: {uri}"))?,
            Ok(url) if url.scheme().len() > 1 => bail!("unsupported uri scheme '{}'", url.scheme()),
            _ => uri.into(),
        };
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Serves documents from memory and counts fetches
#[derive(Debug, Default)]
pub struct MemoryResolver {
    files: HashMap<String, String>,
    fetches: Cell<usize>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, uri: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(uri.into(), text.into());
        self
    }

    /// Number of `resolve` calls so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

#[async_trait(?Send)]
impl ContentResolver for MemoryResolver {
    async fn resolve(&self, uri: &str) -> Result<String> {
        self.fetches.set(self.fetches.get() + 1);
        // let concurrent loads interleave
        tokio::task::yield_now().await;
        self.files
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow!("no such document: {uri}"))
    }
}
