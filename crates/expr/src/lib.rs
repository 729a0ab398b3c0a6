//! A small, restricted expression language over JSON values.
//!
//! Templates use it for directive conditions, loop bounds and inline
//! injections. Names resolve against a [`Scope`] and calls resolve against a
//! [`FunctionRegistry`]; nothing else is reachable, so evaluating untrusted
//! template text cannot run host code.
//!
//! Two entry points:
//! - expressions (`user.admin && count(items) > 0`) via [`parse_expression`]
//! - statement blocks (`total = total + price; return total`) via [`parse_script`]

pub mod ast;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
mod parser;
pub mod scope;
pub mod value;

// --- Public API ---
pub use ast::{BinaryOp, Expression, PathSegment, Place, Script, Statement, UnaryOp};
pub use engine::{EvaluationContext, evaluate, evaluate_as_bool, evaluate_as_string, execute};
pub use error::ExprError;
pub use evaluator::{ExpressionEvaluator, ScopeEvaluator};
pub use functions::{ExprFunction, FunctionRegistry};
pub use parser::{MAX_NESTING, parse_expression, parse_script};
pub use scope::Scope;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn e_ctx<'a>(scope: &'a Scope, funcs: &'a FunctionRegistry) -> EvaluationContext<'a> {
        EvaluationContext {
            scope,
            functions: funcs,
        }
    }

    #[test]
    fn test_parse_and_eval_simple_path() {
        let expr = parse_expression("customer.name").unwrap();
        let scope = Scope::try_from(json!({ "customer": { "name": "ACME" } })).unwrap();
        let funcs = FunctionRegistry::default();
        let result = evaluate(&expr, &e_ctx(&scope, &funcs)).unwrap();
        assert_eq!(result, json!("ACME"));
    }

    #[test]
    fn test_parse_and_eval_nested_function_with_path() {
        let expr = parse_expression("concat('ID: ', upper(customer.orders[0].id))").unwrap();
        let scope = Scope::try_from(json!({ "customer": { "orders": [{ "id": "xn123" }] } })).unwrap();
        let funcs = FunctionRegistry::default();
        let result = evaluate_as_string(&expr, &e_ctx(&scope, &funcs)).unwrap();
        assert_eq!(result, "ID: XN123");
    }

    #[test]
    fn test_eval_as_bool_uses_truthiness() {
        let expr = parse_expression("items").unwrap();
        let funcs = FunctionRegistry::default();
        let blank = Scope::try_from(json!({ "items": "" })).unwrap();
        let empty = Scope::try_from(json!({ "items": [] })).unwrap();
        let full = Scope::try_from(json!({ "items": [1] })).unwrap();
        assert!(!evaluate_as_bool(&expr, &e_ctx(&blank, &funcs)).unwrap());
        assert!(evaluate_as_bool(&expr, &e_ctx(&empty, &funcs)).unwrap());
        assert!(evaluate_as_bool(&expr, &e_ctx(&full, &funcs)).unwrap());
    }

    #[test]
    fn test_nested_object_literal_argument() {
        fn keys(_: &EvaluationContext, args: Vec<serde_json::Value>) -> Result<serde_json::Value, ExprError> {
            let names: Vec<_> = args
                .first()
                .and_then(|v| v.as_object())
                .map(|o| o.keys().cloned().collect())
                .unwrap_or_default();
            Ok(json!(names.join(",")))
        }
        let mut funcs = FunctionRegistry::default();
        funcs.register("keys", keys);
        let scope = Scope::new();
        let expr = parse_expression("keys({a: 1, b: {c: 2}})").unwrap();
        assert_eq!(evaluate(&expr, &e_ctx(&scope, &funcs)).unwrap(), json!("a,b"));
    }
}
