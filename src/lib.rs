//! Server-side HTML templates with directive tags, inline expressions and
//! cached asset resolution.
//!
//! ```ignore
//! use trellis::{Engine, EngineConfig, Scope};
//!
//! let engine = Engine::new("views", EngineConfig::default());
//! let mut scope = Scope::new();
//! scope.set("user", serde_json::json!({ "name": "Ada", "admin": true }));
//! let html = engine.render("index", scope)?;
//! ```
//!
//! Templates use five custom tags:
//! - `<if condition="...">`, `<elif condition="...">`, `<else>`
//! - `<repeat times="..." index="i">` or `<repeat from="..." to="..." index="i">`
//! - `<import src="partials/nav">` for templates, scripts and stylesheets
//!
//! plus `#{expression}` and `@{statements}` anywhere in the markup. Script,
//! stylesheet and image references are rewritten to views-relative paths,
//! which [`Engine::public_file`] maps back for the web server.

pub mod assets;
pub mod config;
pub mod directives;
pub mod engine;
pub mod error;
pub mod serve;

pub use assets::{AssetKind, AssetRecord, CacheStats};
pub use config::EngineConfig;
pub use directives::Directive;
pub use engine::{Engine, EngineBuilder};
pub use error::RenderError;
pub use serve::PublicAsset;

pub use trellis_expr::{ExprError, ExpressionEvaluator, FunctionRegistry, Scope, ScopeEvaluator};
pub use trellis_markup::Document;
pub use trellis_traits::{ResourceError, ResourceProvider};
