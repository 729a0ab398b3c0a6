//! The hook a web server uses to serve the assets rendered pages reference.
//!
//! Only files some render has resolved are public; anything else below the
//! views root (templates included) stays private.
use crate::assets::{AssetKind, AssetRecord};
use crate::engine::Engine;
use std::path::PathBuf;
use std::sync::Arc;

/// A servable asset, with its rewritten body when it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicAsset {
    pub path: PathBuf,
    pub relative: String,
    pub kind: AssetKind,
    /// Rewritten script or stylesheet source. `None` for resources, which
    /// are served from disk as they are.
    pub content: Option<String>,
    pub content_type: String,
}

impl Engine {
    fn public_record(&self, request_path: &str) -> Option<Arc<AssetRecord>> {
        let absolute = self.paths.from_request(request_path)?;
        self.lock().assets.find(&absolute)
    }

    /// Maps a request path such as `/js/app.js` to the file to send, if the
    /// file was referenced by a rendered template and exists.
    pub fn public_file(&self, request_path: &str) -> Option<PathBuf> {
        let record = self.public_record(request_path)?;
        if !self.provider.exists(&record.absolute) {
            log::debug!("Public file {} no longer exists", record.relative);
            return None;
        }
        Some(record.absolute.clone())
    }

    /// Views-relative paths of every asset resolved so far, sorted. These are
    /// the request paths [`public_file`](Self::public_file) answers for.
    pub fn public_paths(&self) -> Vec<String> {
        let state = self.lock();
        let mut paths: Vec<String> = [AssetKind::Script, AssetKind::Style, AssetKind::Resource]
            .into_iter()
            .flat_map(|kind| state.assets.records(kind))
            .map(|record| record.relative.clone())
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Like [`public_file`](Self::public_file), also returning the rewritten
    /// body of scripts and styles, whose imports differ from the file on disk.
    pub fn public_asset(&self, request_path: &str) -> Option<PublicAsset> {
        let record = self.public_record(request_path)?;
        if record.content().is_none() && !self.provider.exists(&record.absolute) {
            return None;
        }
        Some(PublicAsset {
            path: record.absolute.clone(),
            relative: record.relative.clone(),
            kind: record.kind,
            content: record.content().map(str::to_string),
            content_type: mime_guess::from_path(&record.absolute)
                .first_or_octet_stream()
                .to_string(),
        })
    }
}
