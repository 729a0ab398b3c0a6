//! Resolution of scripts, styles and resources referenced from templates.
//!
//! Every distinct file is read and rewritten at most once per cache
//! lifetime. References inside scripts (`import ... from`) and styles
//! (`url()`, `@import`) are rewritten to their servable, views-relative form,
//! resolving the referenced files recursively.

pub mod cache;
pub mod path;
pub mod script;
pub mod style;

pub use cache::{AssetCache, AssetKind, AssetRecord, CacheStats};
pub use path::{PathResolver, Resolved};

use crate::error::RenderError;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trellis_traits::ResourceProvider;

/// A reference found inside a script or style body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Byte range of the target text, quotes excluded.
    pub range: Range<usize>,
    pub target: String,
    pub kind: AssetKind,
}

#[derive(Debug, Clone)]
pub enum Resolution {
    Remote,
    Local {
        record: Arc<AssetRecord>,
        suffix: String,
    },
}

impl Resolution {
    /// The text to write in place of the original reference; `None` means
    /// leave the reference as it was.
    pub fn reference(&self) -> Option<String> {
        match self {
            Resolution::Remote => None,
            Resolution::Local { record, suffix } => Some(format!("{}{}", record.relative, suffix)),
        }
    }

    pub fn record(&self) -> Option<&Arc<AssetRecord>> {
        match self {
            Resolution::Remote => None,
            Resolution::Local { record, .. } => Some(record),
        }
    }
}

/// Resolves references against one [`AssetCache`] for the span of a render.
pub struct AssetResolver<'a> {
    paths: &'a PathResolver,
    provider: &'a dyn ResourceProvider,
    cache: &'a mut AssetCache,
}

impl<'a> AssetResolver<'a> {
    pub fn new(paths: &'a PathResolver, provider: &'a dyn ResourceProvider, cache: &'a mut AssetCache) -> Self {
        Self { paths, provider, cache }
    }

    pub fn resolve(&mut self, kind: AssetKind, base_dir: &Path, target: &str) -> Result<Resolution, RenderError> {
        match self.paths.resolve(base_dir, target) {
            Resolved::Remote => Ok(Resolution::Remote),
            Resolved::Local { path, suffix } => Ok(Resolution::Local {
                record: self.record(kind, path)?,
                suffix,
            }),
        }
    }

    /// Images, fonts and other files that are served as they are.
    pub fn resolve_resource(&mut self, base_dir: &Path, target: &str) -> Result<Resolution, RenderError> {
        self.resolve(AssetKind::Resource, base_dir, target)
    }

    fn record(&mut self, kind: AssetKind, path: PathBuf) -> Result<Arc<AssetRecord>, RenderError> {
        if let Some(hit) = self.cache.lookup(kind, &path) {
            log::trace!("{} cache hit: {}", kind.name(), hit.relative);
            return Ok(hit);
        }

        let relative = self.paths.relative(&path)?;
        log::debug!("Resolving {} {}", kind.name(), relative);
        // Cached before rewriting so that import cycles find it.
        let record = self.cache.insert(AssetRecord::new(kind, path.clone(), relative));

        if kind == AssetKind::Resource {
            if !self.provider.exists(&path) {
                log::warn!("Referenced resource {} does not exist", record.relative);
            }
            return Ok(record);
        }

        match self.load_and_rewrite(kind, &path) {
            Ok(content) => {
                record.set_content(content);
                Ok(record)
            }
            Err(e) => {
                self.cache.remove(kind, &path);
                Err(e)
            }
        }
    }

    fn load_and_rewrite(&mut self, kind: AssetKind, path: &Path) -> Result<String, RenderError> {
        let source = self.provider.load_to_string(path)?;
        let paths = self.paths;
        let base_dir = path.parent().unwrap_or(paths.views());
        self.rewrite(kind, base_dir, &source)
    }

    /// Rewrites the references in `content`, resolving each relative to `base_dir`.
    pub fn rewrite(&mut self, kind: AssetKind, base_dir: &Path, content: &str) -> Result<String, RenderError> {
        let references = references(kind, content);
        self.rewrite_references(base_dir, content, references)
    }

    fn rewrite_references(
        &mut self,
        base_dir: &Path,
        content: &str,
        references: Vec<Reference>,
    ) -> Result<String, RenderError> {
        if references.is_empty() {
            return Ok(content.to_string());
        }

        let mut out = String::with_capacity(content.len());
        let mut last = 0;
        for reference in references {
            out.push_str(&content[last..reference.range.start]);
            match self.resolve(reference.kind, base_dir, &reference.target)?.reference() {
                Some(rewritten) => out.push_str(&rewritten),
                None => out.push_str(&content[reference.range.clone()]),
            }
            last = reference.range.end;
        }
        out.push_str(&content[last..]);
        Ok(out)
    }

    /// Like [`rewrite`](Self::rewrite) for inline blocks, cached by base
    /// directory and content. Blocks without references are returned as they
    /// are and never cached.
    pub fn rewrite_inline(&mut self, kind: AssetKind, base_dir: &Path, content: &str) -> Result<Arc<str>, RenderError> {
        if let Some(hit) = self.cache.inline(kind, base_dir, content) {
            return Ok(hit);
        }
        let references = references(kind, content);
        if references.is_empty() {
            return Ok(Arc::from(content));
        }
        let rewritten = self.rewrite_references(base_dir, content, references)?;
        Ok(self.cache.insert_inline(kind, base_dir, content, rewritten))
    }
}

fn references(kind: AssetKind, content: &str) -> Vec<Reference> {
    match kind {
        AssetKind::Script => script::module_references(content),
        AssetKind::Style => style::style_references(content),
        AssetKind::Resource => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_traits::InMemoryResourceProvider;

    fn setup(files: &[(&str, &str)]) -> (PathResolver, InMemoryResourceProvider) {
        let provider = InMemoryResourceProvider::new();
        for (path, content) in files {
            provider.add(*path, content.as_bytes().to_vec()).unwrap();
        }
        (PathResolver::new("/views"), provider)
    }

    #[test]
    fn test_script_imports_are_rewritten_recursively() {
        let (paths, provider) = setup(&[
            ("/views/js/app.js", "import { h } from './lib/h.js';\nh()"),
            ("/views/js/lib/h.js", "import '../../shared/polyfill.js'; export const h = 1"),
            ("/views/shared/polyfill.js", "window.x = 1"),
        ]);
        let mut cache = AssetCache::new();
        let mut resolver = AssetResolver::new(&paths, &provider, &mut cache);
        let res = resolver.resolve_script(Path::new("/views/pages"), "/js/app.js").unwrap();
        assert_eq!(res.reference().as_deref(), Some("/js/app.js"));
        assert_eq!(
            res.record().unwrap().content(),
            Some("import { h } from '/js/lib/h.js';\nh()")
        );
        let lib = cache.lookup(AssetKind::Script, Path::new("/views/js/lib/h.js")).unwrap();
        assert_eq!(lib.content(), Some("import '/shared/polyfill.js'; export const h = 1"));
        assert_eq!(cache.stats().scripts, 3);
    }

    #[test]
    fn test_import_cycle_terminates() {
        let (paths, provider) = setup(&[
            ("/views/a.js", "import b from './b.js'; export default 1"),
            ("/views/b.js", "import a from './a.js'; export default 2"),
        ]);
        let mut cache = AssetCache::new();
        let mut resolver = AssetResolver::new(&paths, &provider, &mut cache);
        let res = resolver.resolve_script(Path::new("/views"), "./a.js").unwrap();
        assert_eq!(
            res.record().unwrap().content(),
            Some("import b from '/b.js'; export default 1")
        );
        let b = cache.lookup(AssetKind::Script, Path::new("/views/b.js")).unwrap();
        assert_eq!(b.content(), Some("import a from '/a.js'; export default 2"));
    }

    #[test]
    fn test_style_urls_and_imports() {
        let (paths, provider) = setup(&[
            ("/views/css/site.css", "@import 'base.css';\nbody { background: url(../img/bg.png?v=3) }"),
            ("/views/css/base.css", "h1 { background: url(\"/img/h1.png\") }"),
        ]);
        let mut cache = AssetCache::new();
        let mut resolver = AssetResolver::new(&paths, &provider, &mut cache);
        let res = resolver.resolve_style(Path::new("/views"), "css/site.css").unwrap();
        assert_eq!(
            res.record().unwrap().content(),
            Some("@import '/css/base.css';\nbody { background: url(/img/bg.png?v=3) }")
        );
        let stats = cache.stats();
        assert_eq!((stats.styles, stats.resources), (2, 2));
        let bg = cache.lookup(AssetKind::Resource, Path::new("/views/img/bg.png")).unwrap();
        assert_eq!(bg.content(), None);
    }

    #[test]
    fn test_missing_file_is_not_cached() {
        let (paths, provider) = setup(&[]);
        let mut cache = AssetCache::new();
        let mut resolver = AssetResolver::new(&paths, &provider, &mut cache);
        let err = resolver.resolve_script(Path::new("/views"), "./gone.js").unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remote_and_outside_references() {
        let (paths, provider) = setup(&[]);
        let mut cache = AssetCache::new();
        let mut resolver = AssetResolver::new(&paths, &provider, &mut cache);
        let remote = resolver.resolve_script(Path::new("/views"), "https://cdn/x.js").unwrap();
        assert!(remote.reference().is_none());
        assert!(matches!(
            resolver.resolve_resource(Path::new("/views"), "../etc/logo.png"),
            Err(RenderError::OutsideViews(_))
        ));
    }

    #[test]
    fn test_inline_rewrites_are_cached() {
        let (paths, provider) = setup(&[("/views/js/m.js", "export default 1")]);
        let mut cache = AssetCache::new();
        let mut resolver = AssetResolver::new(&paths, &provider, &mut cache);
        let body = "import m from './m.js'; m()";
        let first = resolver.resolve_inline_script(Path::new("/views/js"), body).unwrap();
        let second = resolver.resolve_inline_script(Path::new("/views/js"), body).unwrap();
        assert_eq!(&*first, "import m from '/js/m.js'; m()");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().inline, 1);
    }

    #[test]
    fn test_inline_blocks_without_references_skip_the_cache() {
        let (paths, provider) = setup(&[]);
        let mut cache = AssetCache::new();
        let mut resolver = AssetResolver::new(&paths, &provider, &mut cache);
        let plain = resolver.resolve_inline_script(Path::new("/views"), "const n = 1;").unwrap();
        let remote = resolver
            .resolve_inline_style(Path::new("/views"), "a { background: url(https://cdn/x.png) }")
            .unwrap();
        assert_eq!(&*plain, "const n = 1;");
        assert_eq!(&*remote, "a { background: url(https://cdn/x.png) }");
        assert_eq!(cache.stats().inline, 0);
    }
}
