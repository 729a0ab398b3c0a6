pub mod fixtures;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use trellis::{Engine, EngineConfig, ResourceError, ResourceProvider};
use trellis_resource::FilesystemResourceProvider;
use trellis_traits::SharedResourceData;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A views directory on disk that lives as long as the value.
pub struct Views {
    dir: TempDir,
}

impl Views {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let views = Self {
            dir: TempDir::new().expect("create temp views dir"),
        };
        for (path, content) in files {
            views.write(path, content);
        }
        views
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative.trim_start_matches('/'))
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.file(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create views subdirectory");
        }
        fs::write(path, content).expect("write views file");
    }

    pub fn engine(&self) -> Engine {
        self.engine_with(EngineConfig::default())
    }

    pub fn engine_with(&self, config: EngineConfig) -> Engine {
        Engine::builder()
            .with_views(self.path())
            .with_config(config)
            .build()
            .expect("build engine")
    }

    /// An engine whose file reads are counted.
    pub fn counted_engine(&self, config: EngineConfig) -> (Engine, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider::new(self.path()));
        let engine = Engine::builder()
            .with_views(self.path())
            .with_config(config)
            .with_provider(provider.clone())
            .build()
            .expect("build engine");
        (engine, provider)
    }
}

/// Filesystem provider that records how often each path is loaded.
#[derive(Debug)]
pub struct CountingProvider {
    inner: FilesystemResourceProvider,
    loads: Mutex<HashMap<PathBuf, usize>>,
}

impl CountingProvider {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: FilesystemResourceProvider::confined(root),
            loads: Mutex::new(HashMap::new()),
        }
    }

    pub fn loads(&self, path: &Path) -> usize {
        self.loads.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.loads.lock().unwrap().values().sum()
    }
}

impl ResourceProvider for CountingProvider {
    fn load(&self, path: &Path) -> Result<SharedResourceData, ResourceError> {
        *self.loads.lock().unwrap().entry(path.to_path_buf()).or_insert(0) += 1;
        self.inner.load(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn name(&self) -> &'static str {
        "CountingProvider"
    }
}
