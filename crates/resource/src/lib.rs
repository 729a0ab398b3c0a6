//! Where trellis reads templates, scripts and stylesheets from.
//!
//! [`FilesystemResourceProvider`] reads the local filesystem and, when built
//! with [`FilesystemResourceProvider::confined`], refuses any path that
//! escapes the views directory. [`InMemoryResourceProvider`] is re-exported
//! from `trellis-traits` for tests and embedded views.

mod filesystem;

pub use filesystem::FilesystemResourceProvider;
pub use trellis_traits::InMemoryResourceProvider;
