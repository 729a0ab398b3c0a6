use thiserror::Error;

/// Errors raised while tokenizing template markup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("Markup syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },
}

impl MarkupError {
    pub(crate) fn syntax(position: usize, err: impl std::fmt::Display) -> Self {
        MarkupError::Syntax {
            position,
            message: err.to_string(),
        }
    }
}
