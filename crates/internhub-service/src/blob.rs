//! Document content storage

use async_trait::async_trait;
use internhub_core::{DomainError, DomainResult};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Byte storage addressed by relative `/`-separated keys
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> DomainResult<()>;
    async fn get(&self, key: &str) -> DomainResult<Vec<u8>>;
    /// Deleting a missing key is not an error
    async fn delete(&self, key: &str) -> DomainResult<()>;
}

/// Files under a root directory
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path that stays inside the root
    fn resolve(&self, key: &str) -> DomainResult<PathBuf> {
        let rel = Path::new(key);
        let escapes = key.is_empty()
            || key.contains('\\')
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(DomainError::Storage(format!("invalid blob key '{key}'")));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalDiskStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> DomainResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("part");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &path).await?;
        debug!(key, bytes = bytes.len(), "blob stored");
        Ok(())
    }

    async fn get(&self, key: &str) -> DomainResult<Vec<u8>> {
        let path = self.resolve(key)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DomainError::Storage(format!("blob '{key}' is missing")),
            _ => e.into(),
        })
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
