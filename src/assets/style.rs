//! `url()` and `@import` rewriting for stylesheets.
use super::{AssetKind, AssetResolver, Reference, Resolution, path};
use crate::error::RenderError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::Arc;

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^"'\s)]+))\s*\)"#)
        .expect("BUG: invalid URL regex literal")
});

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)@import\s+(?:"([^"]*)"|'([^']*)')"#).expect("BUG: invalid IMPORT regex literal")
});

fn is_rewritable(target: &str) -> bool {
    let target = target.trim();
    !target.is_empty() && !target.starts_with('#') && !path::is_remote(target)
}

fn is_stylesheet(target: &str) -> bool {
    path::split_suffix(target).0.to_ascii_lowercase().ends_with(".css")
}

fn first_group<'h>(captures: &Captures<'h>) -> Option<regex::Match<'h>> {
    (1..captures.len()).find_map(|i| captures.get(i))
}

/// Finds every rewritable `url(...)` and `@import '...'` reference, in order.
/// `url()` targets ending in `.css` are stylesheets, everything else is a resource.
pub fn style_references(content: &str) -> Vec<Reference> {
    let urls = URL.captures_iter(content).filter_map(|c| first_group(&c)).map(|m| {
        let kind = if is_stylesheet(m.as_str()) {
            AssetKind::Style
        } else {
            AssetKind::Resource
        };
        (m, kind)
    });
    let imports = IMPORT
        .captures_iter(content)
        .filter_map(|c| first_group(&c))
        .map(|m| (m, AssetKind::Style));

    let mut references: Vec<Reference> = urls
        .chain(imports)
        .filter(|(m, _)| is_rewritable(m.as_str()))
        .map(|(m, kind)| Reference {
            range: m.range(),
            target: m.as_str().to_string(),
            kind,
        })
        .collect();
    references.sort_by_key(|r| r.range.start);
    references
}

impl AssetResolver<'_> {
    /// Resolves a stylesheet, rewriting its references on first sight.
    pub fn resolve_style(&mut self, base_dir: &Path, target: &str) -> Result<Resolution, RenderError> {
        self.resolve(AssetKind::Style, base_dir, target)
    }

    /// Rewrites the references of an inline `<style>` body.
    pub fn resolve_inline_style(&mut self, base_dir: &Path, content: &str) -> Result<Arc<str>, RenderError> {
        self.rewrite_inline(AssetKind::Style, base_dir, content)
    }
}
