//! Defines the error type for all rendering operations.

use std::path::PathBuf;
use thiserror::Error;
use trellis_expr::ExprError;
use trellis_markup::MarkupError;
use trellis_traits::ResourceError;

/// Any failure aborts the whole render; there is no partial output.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
    #[error("Failed to evaluate '{expression}': {source}")]
    Expression {
        expression: String,
        source: ExprError,
    },
    #[error("Markup error: {0}")]
    Markup(#[from] MarkupError),
    #[error("Malformed <{directive}>: {message}")]
    MalformedDirective { directive: String, message: String },
    #[error("Path '{}' is outside the views directory", .0.display())]
    OutsideViews(PathBuf),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RenderError {
    pub(crate) fn expression(expression: &str, source: ExprError) -> Self {
        RenderError::Expression {
            expression: expression.trim().to_string(),
            source,
        }
    }

    pub(crate) fn malformed(directive: &str, message: impl Into<String>) -> Self {
        RenderError::MalformedDirective {
            directive: directive.to_string(),
            message: message.into(),
        }
    }

    /// True when the failure is a missing template or asset file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RenderError::Resource(e) if e.is_not_found())
    }
}
