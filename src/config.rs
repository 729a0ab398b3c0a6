use crate::error::RenderError;
use serde::{Deserialize, Serialize};

/// Engine options.
///
/// Missing fields take their defaults when deserializing, so a partial
/// `{"cache": false}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Keep templates and resolved assets across renders. When off, every
    /// top-level render starts from empty caches.
    pub cache: bool,
    /// Reserved. Output is never minified.
    pub minify: bool,
    /// Upper bound on the iterations of a single `repeat`.
    pub max_iterations: usize,
    /// Upper bound on nested `import`s.
    pub max_import_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: true,
            minify: false,
            max_iterations: 10_000,
            max_import_depth: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        serde_json::from_str(json).map_err(|e| RenderError::Config(format!("Invalid engine configuration: {}", e)))
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_import_depth(mut self, max_import_depth: usize) -> Self {
        self.max_import_depth = max_import_depth;
        self
    }
}
