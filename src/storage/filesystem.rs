//! Filesystem blob store
//!
//! Containers are directories under a root; blob paths are `/`-separated
//! relative paths inside them. Absolute paths and `..` segments are rejected.

use super::errors::{StorageError, StorageResult};
use super::traits::BlobStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_dir(&self, container: &str) -> StorageResult<PathBuf> {
        let relative = safe_relative_path(container, "container")?;
        if relative.components().count() != 1 {
            return Err(invalid_path("container", container));
        }
        Ok(self.root.join(relative))
    }

    fn blob_path(&self, container: &str, path: &str) -> StorageResult<PathBuf> {
        Ok(self
            .container_dir(container)?
            .join(safe_relative_path(path, "blob path")?))
    }
}

fn invalid_path(what: &str, value: &str) -> StorageError {
    StorageError::Backend {
        operation: format!("resolve {what}"),
        message: format!("invalid {what} '{value}'"),
    }
}

fn safe_relative_path(value: &str, what: &str) -> StorageResult<PathBuf> {
    let path = Path::new(value);
    if value.is_empty() || path.is_absolute() {
        return Err(invalid_path(what, value));
    }
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(invalid_path(what, value)),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(invalid_path(what, value));
    }
    Ok(clean)
}

/// Recursively collect `/`-joined paths of regular files below `dir`
async fn walk(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut found = Vec::new();
    let mut pending = vec![(dir.to_path_buf(), String::new())];

    while let Some((current, relative)) = pending.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = if relative.is_empty() {
                name
            } else {
                format!("{relative}/{name}")
            };
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), child));
            } else {
                found.push(child);
            }
        }
    }
    Ok(found)
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn exists(&self, container: &str, path: &str) -> StorageResult<bool> {
        let full = self.blob_path(container, path)?;
        match fs::metadata(&full).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::backend("check blob existence", e)),
        }
    }

    async fn read(&self, container: &str, path: &str) -> StorageResult<Vec<u8>> {
        let full = self.blob_path(container, path)?;
        match fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(
                "Blob",
                format!("{container}/{path}"),
            )),
            Err(e) => Err(StorageError::backend("read blob", e)),
        }
    }

    async fn write(&self, container: &str, path: &str, bytes: Vec<u8>) -> StorageResult<()> {
        let full = self.blob_path(container, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::backend("create blob directory", e))?;
        }
        fs::write(&full, bytes)
            .await
            .map_err(|e| StorageError::backend("write blob", e))?;
        debug!(container = container, path = path, "Blob written");
        Ok(())
    }

    async fn list(&self, container: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let dir = self.container_dir(container)?;
        let mut paths = match walk(&dir).await {
            Ok(paths) => paths,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::backend("list blobs", e)),
        };
        paths.retain(|path| path.starts_with(prefix));
        paths.sort();
        Ok(paths)
    }

    async fn delete(&self, container: &str, path: &str) -> StorageResult<bool> {
        let full = self.blob_path(container, path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::backend("delete blob", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());

        store
            .write("agent", "evalresults/run1/evaluation_results_1.json", b"{}".to_vec())
            .await
            .unwrap();
        store
            .write("agent", "evalresults/run2/results.json", b"[]".to_vec())
            .await
            .unwrap();

        assert!(store
            .exists("agent", "evalresults/run1/evaluation_results_1.json")
            .await
            .unwrap());
        assert_eq!(
            store.read("agent", "evalresults/run2/results.json").await.unwrap(),
            b"[]".to_vec()
        );
        assert_eq!(
            store.list("agent", "evalresults/run1/").await.unwrap(),
            vec!["evalresults/run1/evaluation_results_1.json"]
        );
    }

    #[tokio::test]
    async fn test_missing_container_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        assert!(store.list("nobody", "").await.unwrap().is_empty());
        assert!(!store.exists("nobody", "a.json").await.unwrap());
        assert!(store.read("nobody", "a.json").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());

        assert!(store.write("agent", "../escape.json", vec![]).await.is_err());
        assert!(store.write("agent", "/etc/passwd", vec![]).await.is_err());
        assert!(store.write("..", "a.json", vec![]).await.is_err());
        assert!(store.write("a/b", "a.json", vec![]).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        store.write("agent", "x.json", b"1".to_vec()).await.unwrap();
        assert!(store.delete("agent", "x.json").await.unwrap());
        assert!(!store.delete("agent", "x.json").await.unwrap());
    }
}
