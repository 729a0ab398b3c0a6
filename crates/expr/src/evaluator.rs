//! The evaluator contract the renderer depends on, and its default implementation.
use crate::ast::{Expression, Script};
use crate::engine::{self, EvaluationContext};
use crate::error::ExprError;
use crate::functions::FunctionRegistry;
use crate::parser::{parse_expression, parse_script};
use crate::scope::Scope;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

/// Evaluates template expressions against a scope.
///
/// `evaluate` handles single expressions (conditions, bounds, `#{...}`);
/// `execute` handles statement blocks (`@{...}`) that may write to the scope.
pub trait ExpressionEvaluator: Send + Sync + Debug {
    fn evaluate(&self, source: &str, scope: &Scope) -> Result<Value, ExprError>;

    fn execute(&self, source: &str, scope: &mut Scope) -> Result<Value, ExprError>;
}

/// The default evaluator: parses with the restricted expression grammar and
/// interprets over JSON values. Parsed sources are memoized, since repeat
/// bodies evaluate the same text once per iteration.
#[derive(Debug, Default)]
pub struct ScopeEvaluator {
    functions: FunctionRegistry,
    expressions: RwLock<HashMap<String, Arc<Expression>>>,
    scripts: RwLock<HashMap<String, Arc<Script>>>,
}

impl ScopeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(functions: FunctionRegistry) -> Self {
        Self {
            functions,
            ..Self::default()
        }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    fn expression(&self, source: &str) -> Result<Arc<Expression>, ExprError> {
        if let Some(hit) = self.expressions.read().ok().and_then(|m| m.get(source).cloned()) {
            return Ok(hit);
        }
        let parsed = Arc::new(parse_expression(source)?);
        if let Ok(mut cache) = self.expressions.write() {
            cache.insert(source.to_string(), Arc::clone(&parsed));
        }
        Ok(parsed)
    }

    fn script(&self, source: &str) -> Result<Arc<Script>, ExprError> {
        if let Some(hit) = self.scripts.read().ok().and_then(|m| m.get(source).cloned()) {
            return Ok(hit);
        }
        let parsed = Arc::new(parse_script(source)?);
        if let Ok(mut cache) = self.scripts.write() {
            cache.insert(source.to_string(), Arc::clone(&parsed));
        }
        Ok(parsed)
    }
}

impl ExpressionEvaluator for ScopeEvaluator {
    fn evaluate(&self, source: &str, scope: &Scope) -> Result<Value, ExprError> {
        let expr = self.expression(source)?;
        let e_ctx = EvaluationContext {
            scope,
            functions: &self.functions,
        };
        engine::evaluate(&expr, &e_ctx)
    }

    fn execute(&self, source: &str, scope: &mut Scope) -> Result<Value, ExprError> {
        let script = self.script(source)?;
        engine::execute(&script, scope, &self.functions)
    }
}
