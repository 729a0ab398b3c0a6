use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Parse error in '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Function '{function}' error: {message}")]
    Function { function: String, message: String },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Invalid assignment: {0}")]
    Assignment(String),

    /// Failure reported by a custom `ExpressionEvaluator`.
    #[error("Evaluator error: {0}")]
    Evaluator(String),
}
