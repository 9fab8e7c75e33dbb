//! Object store seam for raw document bytes.
//!
//! The real store is an external collaborator; the pipeline only needs
//! fetch-by-locator (extraction) and put (intake). Locators are opaque
//! strings with a scheme prefix. A locator that cannot be resolved to
//! bytes is `InvalidLocator`, retryable at the worker boundary, since
//! the upload may simply not be visible yet.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage locator: {0}")]
    InvalidLocator(String),

    #[error("Object store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait ObjectStore: Send + Sync {
    /// Resolve a locator to raw bytes.
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, StorageError>;

    /// Store bytes under a case-scoped key and return the locator.
    fn put(&self, case_id: &str, object_name: &str, content: &[u8])
        -> Result<String, StorageError>;
}

/// Filesystem-backed object store using `file://` locators.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(uri: &str) -> Result<PathBuf, StorageError> {
        match uri.strip_prefix("file://") {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Err(StorageError::InvalidLocator(uri.to_string())),
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, StorageError> {
        let path = Self::path_for(uri)?;
        if !path.exists() {
            return Err(StorageError::InvalidLocator(uri.to_string()));
        }
        Ok(std::fs::read(path)?)
    }

    fn put(
        &self,
        case_id: &str,
        object_name: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let dir = self.root.join("cases").join(case_id);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(object_name);
        std::fs::write(&path, content)?;
        Ok(format!("file://{}", path.display()))
    }
}

/// In-memory store for mock mode and tests. Accepts any scheme on `put`
/// side (`mock://`) and fetches whatever was stored under the locator.
#[derive(Default)]
pub struct MockObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an object under an arbitrary locator.
    pub fn insert(&self, uri: &str, content: Vec<u8>) {
        self.objects.lock().unwrap().insert(uri.to_string(), content);
    }
}

impl ObjectStore for MockObjectStore {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| StorageError::InvalidLocator(uri.to_string()))
    }

    fn put(
        &self,
        case_id: &str,
        object_name: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let uri = format!("mock://{case_id}/{object_name}");
        self.insert(&uri, content.to_vec());
        Ok(uri)
    }
}

/// File extension from a mime type, for object naming.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "application/pdf" => "pdf",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let uri = store
            .put("CU-2024-00042", "doc-abc123.pdf", b"pdf bytes")
            .unwrap();
        assert!(uri.starts_with("file://"));
        assert_eq!(store.fetch(&uri).unwrap(), b"pdf bytes");
    }

    #[test]
    fn fs_store_unknown_scheme_is_invalid_locator() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let err = store.fetch("gs://bucket/object.pdf").unwrap_err();
        assert!(matches!(err, StorageError::InvalidLocator(_)));
    }

    #[test]
    fn fs_store_missing_object_is_invalid_locator() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());
        let uri = format!("file://{}/nope.pdf", dir.path().display());
        assert!(matches!(
            store.fetch(&uri).unwrap_err(),
            StorageError::InvalidLocator(_)
        ));
    }

    #[test]
    fn mock_store_round_trip() {
        let store = MockObjectStore::new();
        let uri = store.put("CU-2024-00001", "doc.pdf", b"bytes").unwrap();
        assert_eq!(store.fetch(&uri).unwrap(), b"bytes");
    }

    #[test]
    fn mock_store_unknown_uri_is_invalid_locator() {
        let store = MockObjectStore::new();
        assert!(matches!(
            store.fetch("gs://bucket/missing.pdf").unwrap_err(),
            StorageError::InvalidLocator(_)
        ));
    }

    #[test]
    fn mime_extensions() {
        assert_eq!(extension_for_mime("application/pdf"), "pdf");
        assert_eq!(extension_for_mime("text/csv"), "bin");
    }
}
