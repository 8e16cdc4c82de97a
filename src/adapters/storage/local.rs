//! Object store backed by a local directory

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::ports::{ObjectStore, StorageError};

/// Writes objects as files under a root directory
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for an object name, rejecting names that escape the root
    fn object_path(&self, object_name: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(object_name);
        let safe = !object_name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidName(object_name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put(&self, object_name: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        let path = self.object_path(object_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), size, "Stored object locally");
        Ok(format!("file://{}", path.display()))
    }
}
