//! Defines the Abstract Syntax Tree (AST) for scope expressions.
use serde_json::Value;

/// The top-level representation of a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value, like a string, number, boolean or null.
    Literal(Value),
    /// A bare name looked up in the scope.
    Identifier(String),
    /// An array literal (`[a, 1, 'x']`).
    Array(Vec<Expression>),
    /// An object literal (`{a: 1, 'b': x}`).
    Object(Vec<(String, Expression)>),
    /// Property access (`user.name`).
    Member {
        object: Box<Expression>,
        property: String,
    },
    /// Computed access (`items[0]`, `map[key]`).
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    /// A call to a registered function.
    Call { name: String, args: Vec<Expression> },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `test ? consequent : alternate`
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

/// Represents a segment in an assignment target path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// An object key (e.g., `.name`).
    Key(String),
    /// A computed key or index (e.g., `[0]`, `[name]`).
    Computed(Expression),
}

/// The left-hand side of an assignment: a scope variable and an optional path into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub root: String,
    pub path: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `place = value`
    Assign { place: Place, value: Expression },
    /// `return value`, ends the script.
    Return(Expression),
    /// An expression evaluated for its side effects (function calls).
    Expression(Expression),
}

/// A `;`-separated statement block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub statements: Vec<Statement>,
}
