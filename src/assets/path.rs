//! Maps template references onto files below the views root.
use crate::error::RenderError;
use std::path::{Component, Path, PathBuf};

/// Outcome of resolving a reference found in a template, script or style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// `http(s)://`, protocol-relative `//` and `data:` references. Never rewritten.
    Remote,
    /// A file below (or, erroneously, outside) the views root.
    Local {
        path: PathBuf,
        /// `?query` and/or `#fragment` split off the reference, re-appended on rewrite.
        suffix: String,
    },
}

#[derive(Debug, Clone)]
pub struct PathResolver {
    views: PathBuf,
}

impl PathResolver {
    /// Relative roots are made absolute against the working directory.
    pub fn new(views: impl AsRef<Path>) -> Self {
        let views = views.as_ref();
        let absolute = std::path::absolute(views).unwrap_or_else(|_| views.to_path_buf());
        Self {
            views: normalize(&absolute),
        }
    }

    pub fn views(&self) -> &Path {
        &self.views
    }

    pub fn resolve(&self, base_dir: &Path, target: &str) -> Resolved {
        let target = target.trim();
        if is_remote(target) {
            return Resolved::Remote;
        }
        let (target, suffix) = split_suffix(target);
        let path = match target.strip_prefix('/') {
            Some(rooted) => self.views.join(rooted),
            None => base_dir.join(target),
        };
        Resolved::Local {
            path: normalize(&path),
            suffix: suffix.to_string(),
        }
    }

    /// The servable form of `path`: views-relative, `/`-separated, leading `/`.
    pub fn relative(&self, path: &Path) -> Result<String, RenderError> {
        let rest = path
            .strip_prefix(&self.views)
            .map_err(|_| RenderError::OutsideViews(path.to_path_buf()))?;
        let mut relative = String::new();
        for component in rest.components() {
            match component {
                Component::Normal(part) => {
                    relative.push('/');
                    relative.push_str(&part.to_string_lossy());
                }
                _ => return Err(RenderError::OutsideViews(path.to_path_buf())),
            }
        }
        if relative.is_empty() {
            relative.push('/');
        }
        Ok(relative)
    }

    /// Maps a request path such as `/js/app.js?v=2` back to a file below the
    /// views root. Returns `None` for anything that escapes the root.
    pub fn from_request(&self, request_path: &str) -> Option<PathBuf> {
        let (path, _) = split_suffix(request_path.trim());
        let rooted = path.strip_prefix('/')?;
        let absolute = normalize(&self.views.join(rooted));
        (absolute.starts_with(&self.views) && absolute != self.views).then_some(absolute)
    }

    /// Where a template named `name` lives: relative names are taken from the
    /// views root and `.html` is appended when there is no extension.
    pub fn template(&self, name: &str) -> PathBuf {
        let name = with_default_extension(name.trim(), "html");
        let path = Path::new(name.as_str());
        if path.is_absolute() && path.starts_with(&self.views) {
            normalize(path)
        } else {
            normalize(&self.views.join(name.trim_start_matches('/')))
        }
    }
}

pub fn is_remote(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
        || target.starts_with("//")
}

/// Splits `a.css?v=2#top` into `("a.css", "?v=2#top")`.
pub fn split_suffix(target: &str) -> (&str, &str) {
    match target.find(['?', '#']) {
        Some(i) => target.split_at(i),
        None => (target, ""),
    }
}

/// Appends `.ext` when the last path segment has no extension.
pub fn with_default_extension(target: &str, ext: &str) -> String {
    if Path::new(target).extension().is_some() {
        target.to_string()
    } else {
        format!("{}.{}", target, ext)
    }
}

/// Lexical normalization: `.` is dropped and `..` pops a segment. The file
/// system is never consulted, so the result is stable for in-memory providers.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
