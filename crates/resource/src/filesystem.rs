//! Filesystem-based resource provider for native platforms.
//!
//! # Security
//!
//! A provider can be confined to a root directory. Confined providers
//! canonicalize every requested path and refuse anything that resolves
//! outside the root (symlinks included), reporting it as `NotFound`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use trellis_traits::{ResourceError, ResourceProvider, SharedResourceData};

/// A resource provider that reads from the local filesystem.
#[derive(Debug, Default)]
pub struct FilesystemResourceProvider {
    root: Option<PathBuf>,
    /// Canonicalized root for containment checks
    canonical_root: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    /// Creates an unconfined provider that reads any absolute path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a provider that only serves files below `root`.
    pub fn confined<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        // May fail if the directory doesn't exist yet; checks fall back to components.
        let canonical = root.canonicalize().ok();
        Self {
            root: Some(root),
            canonical_root: canonical,
        }
    }

    /// Returns the confinement root, if any.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Validates a requested path against the confinement root.
    ///
    /// Returns `None` if the path would escape the root.
    fn resolve_path_safe(&self, path: &Path) -> Option<PathBuf> {
        let Some(root) = &self.root else {
            return Some(path.to_path_buf());
        };

        if let (Ok(canonical), Some(base)) = (path.canonicalize(), &self.canonical_root) {
            return canonical.starts_with(base).then_some(canonical);
        }

        // File doesn't exist (or root couldn't be canonicalized): lexical check only.
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return None;
        }
        path.starts_with(root).then(|| path.to_path_buf())
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &Path) -> Result<SharedResourceData, ResourceError> {
        let full_path = self.resolve_path_safe(path).ok_or_else(|| {
            log::warn!("Blocked read outside of views root: {}", path.display());
            ResourceError::NotFound(path.to_path_buf())
        })?;

        std::fs::read(&full_path).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.to_path_buf())
            } else {
                ResourceError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve_path_safe(path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}
