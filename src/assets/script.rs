//! Module specifier rewriting for scripts.
use super::{AssetKind, AssetResolver, Reference, Resolution};
use crate::error::RenderError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

/// Leading whitespace and comments before a statement keyword.
const LEADING: &str = r"^(?:\s+|//[^\n]*|/\*(?s:.*?)\*/)*";

/// `import x from '...'`, `import { a } from "..."`, `export * from '...'`.
static FROM_SPECIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"{}(?:import|export)\b(?s:.*?)\bfrom\s*["']([^"'\n]*)["']"#,
        LEADING
    ))
    .expect("BUG: invalid FROM_SPECIFIER regex literal")
});

/// Side-effect imports: `import './polyfill.js'`.
static BARE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#"{}import\s*["']([^"'\n]*)["']"#, LEADING))
        .expect("BUG: invalid BARE_IMPORT regex literal")
});

/// Only `./`, `../` and root-relative specifiers name files below the views
/// root; bare specifiers belong to an import map or bundler.
fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || (specifier.starts_with('/') && !specifier.starts_with("//"))
}

/// Finds the rewritable module specifiers of `content`. Imports are looked
/// for at the start of every statement and of every line, so modules that
/// rely on automatic semicolon insertion are covered too.
pub fn module_references(content: &str) -> Vec<Reference> {
    let mut references = Vec::new();
    let mut offset = 0;
    for statement in content.split(';') {
        let mut cursor = 0;
        for start in line_starts(statement) {
            if start < cursor {
                continue;
            }
            let Some((end, specifier)) = import_at(&statement[start..]) else {
                continue;
            };
            cursor = start + end;
            if is_path_specifier(specifier.as_str()) {
                references.push(Reference {
                    range: offset + start + specifier.start()..offset + start + specifier.end(),
                    target: specifier.as_str().to_string(),
                    kind: AssetKind::Script,
                });
            }
        }
        offset += statement.len() + 1;
    }
    references
}

fn line_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(0).chain(text.match_indices('\n').map(|(i, _)| i + 1))
}

/// The import form anchored at the start of `text` that ends first, as the
/// end of the whole match and the specifier.
fn import_at(text: &str) -> Option<(usize, regex::Match<'_>)> {
    [&FROM_SPECIFIER, &BARE_IMPORT]
        .into_iter()
        .filter_map(|re| re.captures(text))
        .filter_map(|c| Some((c.get(0)?.end(), c.get(1)?)))
        .min_by_key(|(end, _)| *end)
}

impl AssetResolver<'_> {
    /// Resolves a script file, rewriting its imports on first sight.
    pub fn resolve_script(&mut self, base_dir: &Path, target: &str) -> Result<Resolution, RenderError> {
        self.resolve(AssetKind::Script, base_dir, target)
    }

    /// Rewrites the imports of an inline `<script>` body.
    pub fn resolve_inline_script(&mut self, base_dir: &Path, content: &str) -> Result<Arc<str>, RenderError> {
        self.rewrite_inline(AssetKind::Script, base_dir, content)
    }
}
