//! The template engine: configuration, caches and the render entry points.
use crate::assets::{AssetCache, PathResolver};
use crate::config::EngineConfig;
use crate::directives::Renderer;
use crate::error::RenderError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use trellis_expr::{ExpressionEvaluator, FunctionRegistry, Scope, ScopeEvaluator};
use trellis_markup::Document;
use trellis_resource::FilesystemResourceProvider;
use trellis_traits::ResourceProvider;

/// Caches shared by all renders of one engine.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub(crate) templates: HashMap<PathBuf, Arc<str>>,
    pub(crate) assets: AssetCache,
}

impl EngineState {
    fn clear(&mut self) {
        self.templates.clear();
        self.assets.clear();
    }
}

/// Renders templates below a views directory.
///
/// An engine is `Send + Sync`. Renders hold the cache lock for their whole
/// duration, so concurrent renders on one engine run one after another.
#[derive(Debug)]
pub struct Engine {
    pub(crate) paths: PathResolver,
    pub(crate) config: EngineConfig,
    pub(crate) provider: Arc<dyn ResourceProvider>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    state: Mutex<EngineState>,
}

impl Engine {
    /// An engine reading from the filesystem, confined to `views`.
    pub fn new(views: impl AsRef<Path>, config: EngineConfig) -> Self {
        Self::builder().with_views(views).with_config(config).build_unchecked()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn views(&self) -> &Path {
        self.paths.views()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Renders the template at `path` (absolute, or relative to the views
    /// root; `.html` is appended when there is no extension).
    pub fn render(&self, path: impl AsRef<str>, scope: Scope) -> Result<String, RenderError> {
        let mut scope = scope;
        self.render_with_scope(path, &mut scope)
    }

    /// Like [`render`](Self::render), leaving every assignment the template
    /// made visible in `scope` afterwards.
    pub fn render_with_scope(&self, path: impl AsRef<str>, scope: &mut Scope) -> Result<String, RenderError> {
        let path = self.paths.template(path.as_ref());
        log::info!("Rendering {}", path.display());

        let mut state = self.lock_for_render();
        let mut renderer = self.renderer(&mut state);
        let source = renderer.load_template(&path)?;
        let document = Document::parse(&source)?;
        let html = renderer.process_template(&path, document, scope)?.to_html();

        log::info!("Rendered {} ({} bytes, {:?})", path.display(), html.len(), state.assets.stats());
        Ok(html)
    }

    /// Renders template text held in memory as if it were stored at `name`
    /// below the views root. Relative references resolve from there.
    pub fn render_source(&self, name: &str, source: &str, scope: &mut Scope) -> Result<String, RenderError> {
        let path = self.paths.template(name);
        log::info!("Rendering in-memory template as {}", path.display());

        let mut state = self.lock_for_render();
        let mut renderer = self.renderer(&mut state);
        let document = Document::parse(source)?;
        let html = renderer.process_template(&path, document, scope)?.to_html();
        Ok(html)
    }

    /// Drops every cached template and asset.
    pub fn clear_cache(&self) {
        self.lock().clear();
    }

    pub fn cache_stats(&self) -> crate::assets::CacheStats {
        self.lock().assets.stats()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        // A panic mid-render leaves caches that are at worst incomplete.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_for_render(&self) -> MutexGuard<'_, EngineState> {
        let mut state = self.lock();
        if !self.config.cache {
            state.clear();
        }
        state
    }

    fn renderer<'a>(&'a self, state: &'a mut EngineState) -> Renderer<'a> {
        Renderer::new(
            &self.paths,
            self.provider.as_ref(),
            self.evaluator.as_ref(),
            &self.config,
            state,
        )
    }
}

/// Builder for [`Engine`]. Only the views directory is required.
#[derive(Debug, Default)]
pub struct EngineBuilder {
    views: Option<PathBuf>,
    config: EngineConfig,
    provider: Option<Arc<dyn ResourceProvider>>,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    functions: Option<FunctionRegistry>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory templates and assets are resolved against.
    pub fn with_views(mut self, views: impl AsRef<Path>) -> Self {
        self.views = Some(views.as_ref().to_path_buf());
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.config.cache = cache;
        self
    }

    /// Replaces the filesystem with another source of templates and assets.
    pub fn with_provider(mut self, provider: Arc<dyn ResourceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Functions callable from template expressions. Ignored when a custom
    /// evaluator is supplied.
    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn build(self) -> Result<Engine, RenderError> {
        if self.views.is_none() {
            return Err(RenderError::Config(
                "No views directory has been configured. Use `with_views`.".to_string(),
            ));
        }
        if self.config.max_iterations == 0 {
            return Err(RenderError::Config("max_iterations must be at least 1".to_string()));
        }
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> Engine {
        let paths = PathResolver::new(self.views.unwrap_or_default());
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(FilesystemResourceProvider::confined(paths.views())));
        let evaluator = self.evaluator.unwrap_or_else(|| {
            Arc::new(ScopeEvaluator::with_functions(self.functions.unwrap_or_default()))
        });
        log::debug!(
            "Engine over {} (provider: {}, cache: {})",
            paths.views().display(),
            provider.name(),
            self.config.cache
        );
        Engine {
            paths,
            config: self.config,
            provider,
            evaluator,
            state: Mutex::new(EngineState::default()),
        }
    }
}
