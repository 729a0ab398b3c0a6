//! Caches of resolved scripts, styles and resources.
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Script,
    Style,
    /// Images, fonts and anything else referenced but never rewritten.
    Resource,
}

impl AssetKind {
    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::Script => "script",
            AssetKind::Style => "style",
            AssetKind::Resource => "resource",
        }
    }
}

/// One resolved asset file.
///
/// The record is cached before its content is rewritten, so references back
/// to it (import cycles) see the record with its content still unset.
#[derive(Debug)]
pub struct AssetRecord {
    pub kind: AssetKind,
    pub absolute: PathBuf,
    pub relative: String,
    content: OnceCell<String>,
}

impl AssetRecord {
    pub fn new(kind: AssetKind, absolute: PathBuf, relative: String) -> Self {
        Self {
            kind,
            absolute,
            relative,
            content: OnceCell::new(),
        }
    }

    /// The rewritten source. Always `None` for resources.
    pub fn content(&self) -> Option<&str> {
        self.content.get().map(String::as_str)
    }

    pub(crate) fn set_content(&self, content: String) {
        if self.content.set(content).is_err() {
            log::warn!("Content of {} was already set", self.relative);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub scripts: usize,
    pub styles: usize,
    pub resources: usize,
    pub inline: usize,
}

/// Inline entries kept before the inline map starts over.
pub const MAX_INLINE_ENTRIES: usize = 1024;

/// Per-kind maps keyed by normalized absolute path, plus rewritten inline
/// blocks keyed by a hash of `(kind, base directory, raw content)`.
#[derive(Debug, Default)]
pub struct AssetCache {
    scripts: HashMap<PathBuf, Arc<AssetRecord>>,
    styles: HashMap<PathBuf, Arc<AssetRecord>>,
    resources: HashMap<PathBuf, Arc<AssetRecord>>,
    inline: HashMap<u64, Arc<str>>,
}

fn inline_key(kind: AssetKind, base_dir: &Path, content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    kind.hash(&mut hasher);
    base_dir.hash(&mut hasher);
    content.hash(&mut hasher);
    hasher.finish()
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: AssetKind) -> &HashMap<PathBuf, Arc<AssetRecord>> {
        match kind {
            AssetKind::Script => &self.scripts,
            AssetKind::Style => &self.styles,
            AssetKind::Resource => &self.resources,
        }
    }

    fn map_mut(&mut self, kind: AssetKind) -> &mut HashMap<PathBuf, Arc<AssetRecord>> {
        match kind {
            AssetKind::Script => &mut self.scripts,
            AssetKind::Style => &mut self.styles,
            AssetKind::Resource => &mut self.resources,
        }
    }

    pub fn lookup(&self, kind: AssetKind, path: &Path) -> Option<Arc<AssetRecord>> {
        self.map(kind).get(path).cloned()
    }

    /// Stores `record`, returning the shared handle. An existing record for
    /// the same path is kept and returned instead.
    pub fn insert(&mut self, record: AssetRecord) -> Arc<AssetRecord> {
        Arc::clone(
            self.map_mut(record.kind)
                .entry(record.absolute.clone())
                .or_insert_with(|| Arc::new(record)),
        )
    }

    pub fn remove(&mut self, kind: AssetKind, path: &Path) -> Option<Arc<AssetRecord>> {
        self.map_mut(kind).remove(path)
    }

    /// Looks `path` up in every kind; scripts first, then styles, then resources.
    pub fn find(&self, path: &Path) -> Option<Arc<AssetRecord>> {
        [AssetKind::Script, AssetKind::Style, AssetKind::Resource]
            .into_iter()
            .find_map(|kind| self.lookup(kind, path))
    }

    pub fn inline(&self, kind: AssetKind, base_dir: &Path, content: &str) -> Option<Arc<str>> {
        self.inline.get(&inline_key(kind, base_dir, content)).cloned()
    }

    /// Stores a rewritten inline block. A full inline map is emptied first.
    pub fn insert_inline(&mut self, kind: AssetKind, base_dir: &Path, content: &str, rewritten: String) -> Arc<str> {
        if self.inline.len() >= MAX_INLINE_ENTRIES {
            log::debug!("Inline cache reached {} entries, starting over", self.inline.len());
            self.inline.clear();
        }
        let rewritten: Arc<str> = Arc::from(rewritten);
        self.inline
            .insert(inline_key(kind, base_dir, content), Arc::clone(&rewritten));
        rewritten
    }

    pub fn records(&self, kind: AssetKind) -> impl Iterator<Item = &Arc<AssetRecord>> {
        self.map(kind).values()
    }

    pub fn clear(&mut self) {
        self.scripts.clear();
        self.styles.clear();
        self.resources.clear();
        self.inline.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            scripts: self.scripts.len(),
            styles: self.styles.len(),
            resources: self.resources.len(),
            inline: self.inline.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stats() == CacheStats::default()
    }
}
