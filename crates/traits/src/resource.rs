//! ResourceProvider trait for abstracting template and asset loading.
//!
//! The renderer reads templates, scripts and stylesheets through this trait
//! so it is not tied to the local filesystem. Paths handed to a provider are
//! always absolute and already normalized by the caller.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Error type for resource loading operations.
#[derive(Error, Debug, Clone)]
pub enum ResourceError {
    #[error("Resource not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load resource '{}': {message}", path.display())]
    LoadFailed { path: PathBuf, message: String },

    #[error("Invalid resource format in '{}': {message}", path.display())]
    InvalidFormat { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl ResourceError {
    /// Returns `true` when the error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound(_))
    }
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Shared resource data type (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// A trait for loading template sources and assets.
///
/// # Implementations
///
/// - `FilesystemResourceProvider` (in `trellis-resource`): reads the local filesystem
/// - `InMemoryResourceProvider`: serves pre-populated entries, mainly for tests
///
/// # Example
///
/// ```ignore
/// let provider = InMemoryResourceProvider::new();
/// provider.add("/views/index.html", b"<p>hi</p>".to_vec())?;
/// let html = provider.load_to_string(Path::new("/views/index.html"))?;
/// ```
pub trait ResourceProvider: Send + Sync + Debug {
    /// Load the raw bytes of a resource by absolute path.
    fn load(&self, path: &Path) -> Result<SharedResourceData, ResourceError>;

    /// Load a resource and decode it as UTF-8 text.
    fn load_to_string(&self, path: &Path) -> Result<String, ResourceError> {
        let data = self.load(path)?;
        String::from_utf8(data.to_vec()).map_err(|e| ResourceError::InvalidFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Check if a resource exists.
    fn exists(&self, path: &Path) -> bool;

    /// Returns a human-readable name for this provider (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// An in-memory resource provider.
///
/// Resources are stored in memory and must be pre-populated before use.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
    resources: RwLock<HashMap<PathBuf, SharedResourceData>>,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::LoadFailed` if the internal lock is poisoned.
    pub fn add(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Result<(), ResourceError> {
        let path = path.into();
        let mut resources = self.resources.write().map_err(|_| ResourceError::LoadFailed {
            path: path.clone(),
            message: "resource store lock poisoned".to_string(),
        })?;
        resources.insert(path, Arc::new(data.into()));
        Ok(())
    }

    /// Remove a resource from the store.
    ///
    /// Returns `None` if the lock is poisoned or the resource doesn't exist.
    pub fn remove(&self, path: &Path) -> Option<SharedResourceData> {
        self.resources.write().ok()?.remove(path)
    }

    /// Clear all resources from the store.
    pub fn clear(&self) {
        if let Ok(mut resources) = self.resources.write() {
            resources.clear();
        }
    }

    /// Get the number of resources in the store.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().map(|r| r.is_empty()).unwrap_or(true)
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn load(&self, path: &Path) -> Result<SharedResourceData, ResourceError> {
        let resources = self.resources.read().map_err(|_| ResourceError::LoadFailed {
            path: path.to_path_buf(),
            message: "resource store lock poisoned".to_string(),
        })?;
        resources
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_path_buf()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.resources
            .read()
            .map(|r| r.contains_key(path))
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_provider_add_and_load() {
        let provider = InMemoryResourceProvider::new();
        provider.add("/views/a.html", b"<p>a</p>".to_vec()).unwrap();

        let data = provider.load(Path::new("/views/a.html")).unwrap();
        assert_eq!(&*data, b"<p>a</p>");
    }

    #[test]
    fn test_in_memory_provider_load_to_string() {
        let provider = InMemoryResourceProvider::new();
        provider.add("/views/a.js", "export const a = 1;").unwrap();

        let text = provider.load_to_string(Path::new("/views/a.js")).unwrap();
        assert_eq!(text, "export const a = 1;");
    }

    #[test]
    fn test_in_memory_provider_rejects_invalid_utf8() {
        let provider = InMemoryResourceProvider::new();
        provider.add("/views/bin.css", vec![0xff, 0xfe, 0x00]).unwrap();

        let result = provider.load_to_string(Path::new("/views/bin.css"));
        assert!(matches!(result, Err(ResourceError::InvalidFormat { .. })));
    }

    #[test]
    fn test_in_memory_provider_not_found() {
        let provider = InMemoryResourceProvider::new();
        let result = provider.load(Path::new("/views/missing.html"));
        assert!(matches!(result, Err(ResourceError::NotFound(_))));
        assert!(result.unwrap_err().is_not_found());
    }

    #[test]
    fn test_in_memory_provider_exists() {
        let provider = InMemoryResourceProvider::new();
        provider.add("/views/exists.txt", vec![]).unwrap();

        assert!(provider.exists(Path::new("/views/exists.txt")));
        assert!(!provider.exists(Path::new("/views/not_exists.txt")));
    }

    #[test]
    fn test_in_memory_provider_remove_and_clear() {
        let provider = InMemoryResourceProvider::new();
        provider.add("/a.txt", b"data".to_vec()).unwrap();
        provider.add("/b.txt", vec![]).unwrap();
        assert_eq!(provider.len(), 2);

        let removed = provider.remove(Path::new("/a.txt"));
        assert_eq!(&*removed.unwrap(), b"data");
        assert!(provider.remove(Path::new("/a.txt")).is_none());

        provider.clear();
        assert!(provider.is_empty());
    }

    #[test]
    fn test_in_memory_provider_overwrite() {
        let provider = InMemoryResourceProvider::new();
        provider.add("/test.txt", b"original".to_vec()).unwrap();
        provider.add("/test.txt", b"updated".to_vec()).unwrap();

        let data = provider.load(Path::new("/test.txt")).unwrap();
        assert_eq!(&*data, b"updated");
        assert_eq!(provider.len(), 1);
    }

    #[test]
    fn test_resource_error_display() {
        let err = ResourceError::NotFound(PathBuf::from("/views/test.txt"));
        assert!(err.to_string().contains("/views/test.txt"));

        let err = ResourceError::LoadFailed {
            path: PathBuf::from("file.bin"),
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("file.bin"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_resource_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let resource_err: ResourceError = io_err.into();
        assert!(matches!(resource_err, ResourceError::Io(_)));
        assert!(resource_err.to_string().contains("file not found"));
    }
}
