//! The evaluation engine for executing parsed expressions and scripts.
use crate::ast::{BinaryOp, Expression, PathSegment, Place, Script, Statement, UnaryOp};
use crate::error::ExprError;
use crate::functions::FunctionRegistry;
use crate::scope::Scope;
use crate::value::{self, from_f64, is_truthy, to_number};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A container for all state needed during expression evaluation.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub scope: &'a Scope,
    pub functions: &'a FunctionRegistry,
}

/// Evaluates a parsed expression to a `serde_json::Value`.
///
/// Unknown names and missing properties evaluate to `null`.
pub fn evaluate(expr: &Expression, e_ctx: &EvaluationContext) -> Result<Value, ExprError> {
    match expr {
        Expression::Literal(val) => Ok(val.clone()),
        Expression::Identifier(name) => Ok(e_ctx.scope.get(name).cloned().unwrap_or(Value::Null)),
        Expression::Array(items) => items
            .iter()
            .map(|item| evaluate(item, e_ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expression::Object(fields) => {
            let mut map = Map::new();
            for (key, field) in fields {
                map.insert(key.clone(), evaluate(field, e_ctx)?);
            }
            Ok(Value::Object(map))
        }
        Expression::Member { object, property } => {
            let object = evaluate(object, e_ctx)?;
            Ok(member(&object, property))
        }
        Expression::Index { object, index } => {
            let object = evaluate(object, e_ctx)?;
            let index = evaluate(index, e_ctx)?;
            Ok(index_into(&object, &index))
        }
        Expression::Call { name, args } => {
            let function = e_ctx
                .functions
                .get(name)
                .ok_or_else(|| ExprError::UnknownFunction(name.clone()))?;
            let evaluated_args = args
                .iter()
                .map(|arg| evaluate(arg, e_ctx))
                .collect::<Result<Vec<_>, _>>()?;
            function(e_ctx, evaluated_args)
        }
        Expression::Unary { op, operand } => {
            let operand = evaluate(operand, e_ctx)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&operand))),
                UnaryOp::Negate => numeric(&operand, "-").and_then(|n| finite(-n)),
            }
        }
        Expression::Binary { op, left, right } => binary(*op, left, right, e_ctx),
        Expression::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if is_truthy(&evaluate(test, e_ctx)?) {
                evaluate(consequent, e_ctx)
            } else {
                evaluate(alternate, e_ctx)
            }
        }
    }
}

/// Evaluates an expression and coerces the result to a boolean.
pub fn evaluate_as_bool(expr: &Expression, e_ctx: &EvaluationContext) -> Result<bool, ExprError> {
    evaluate(expr, e_ctx).map(|v| is_truthy(&v))
}

/// Evaluates an expression and coerces the result to a string.
pub fn evaluate_as_string(
    expr: &Expression,
    e_ctx: &EvaluationContext,
) -> Result<String, ExprError> {
    evaluate(expr, e_ctx).map(|v| value::to_string(&v))
}

/// Runs a statement block against a mutable scope.
///
/// Returns the value of the first `return` statement. A block that runs to
/// completion yields its last statement when that is a bare expression, and
/// `null` otherwise, so `@{ total = 1 }` prints nothing.
pub fn execute(
    script: &Script,
    scope: &mut Scope,
    functions: &FunctionRegistry,
) -> Result<Value, ExprError> {
    let mut last = Value::Null;
    for statement in &script.statements {
        match statement {
            Statement::Assign { place, value } => {
                let e_ctx = EvaluationContext {
                    scope: &*scope,
                    functions,
                };
                let value = evaluate(value, &e_ctx)?;
                let keys = place_keys(place, &e_ctx)?;
                assign(scope, &place.root, &keys, value)?;
                last = Value::Null;
            }
            Statement::Return(expr) => {
                let e_ctx = EvaluationContext {
                    scope: &*scope,
                    functions,
                };
                return evaluate(expr, &e_ctx);
            }
            Statement::Expression(expr) => {
                let e_ctx = EvaluationContext {
                    scope: &*scope,
                    functions,
                };
                last = evaluate(expr, &e_ctx)?;
            }
        }
    }
    Ok(last)
}

fn member(object: &Value, property: &str) -> Value {
    match (object, property) {
        (Value::Object(map), _) => map.get(property).cloned().unwrap_or(Value::Null),
        (Value::Array(items), "length") => Value::from(items.len()),
        (Value::String(s), "length") => Value::from(s.chars().count()),
        _ => Value::Null,
    }
}

fn index_into(object: &Value, index: &Value) -> Value {
    match object {
        Value::Object(map) => map
            .get(&value::to_string(index))
            .cloned()
            .unwrap_or(Value::Null),
        Value::Array(items) => array_index(index)
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        Value::String(s) => array_index(index)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn array_index(index: &Value) -> Option<usize> {
    let n = to_number(index)?;
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn numeric(value: &Value, op: &str) -> Result<f64, ExprError> {
    to_number(value).ok_or_else(|| {
        ExprError::Type(format!(
            "operator '{}' cannot be applied to {}",
            op,
            value::type_name(value)
        ))
    })
}

fn finite(n: f64) -> Result<Value, ExprError> {
    from_f64(n).ok_or_else(|| ExprError::Type("result is not a finite number".to_string()))
}

fn binary(
    op: BinaryOp,
    left: &Expression,
    right: &Expression,
    e_ctx: &EvaluationContext,
) -> Result<Value, ExprError> {
    // Logical operators short-circuit and yield an operand, not a boolean.
    match op {
        BinaryOp::And => {
            let l = evaluate(left, e_ctx)?;
            return if is_truthy(&l) { evaluate(right, e_ctx) } else { Ok(l) };
        }
        BinaryOp::Or => {
            let l = evaluate(left, e_ctx)?;
            return if is_truthy(&l) { Ok(l) } else { evaluate(right, e_ctx) };
        }
        _ => {}
    }

    let l = evaluate(left, e_ctx)?;
    let r = evaluate(right, e_ctx)?;
    match op {
        BinaryOp::Add => {
            if l.is_string() || r.is_string() {
                Ok(Value::String(value::to_string(&l) + &value::to_string(&r)))
            } else {
                finite(numeric(&l, "+")? + numeric(&r, "+")?)
            }
        }
        BinaryOp::Subtract => finite(numeric(&l, "-")? - numeric(&r, "-")?),
        BinaryOp::Multiply => finite(numeric(&l, "*")? * numeric(&r, "*")?),
        BinaryOp::Divide => finite(numeric(&l, "/")? / numeric(&r, "/")?),
        BinaryOp::Remainder => finite(numeric(&l, "%")? % numeric(&r, "%")?),
        BinaryOp::Equal => Ok(Value::Bool(value::loose_equals(&l, &r))),
        BinaryOp::NotEqual => Ok(Value::Bool(!value::loose_equals(&l, &r))),
        BinaryOp::StrictEqual => Ok(Value::Bool(value::strict_equals(&l, &r))),
        BinaryOp::StrictNotEqual => Ok(Value::Bool(!value::strict_equals(&l, &r))),
        BinaryOp::Less => Ok(Value::Bool(compare(&l, &r) == Some(Ordering::Less))),
        BinaryOp::LessEqual => Ok(Value::Bool(matches!(
            compare(&l, &r),
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinaryOp::Greater => Ok(Value::Bool(compare(&l, &r) == Some(Ordering::Greater))),
        BinaryOp::GreaterEqual => Ok(Value::Bool(matches!(
            compare(&l, &r),
            Some(Ordering::Greater | Ordering::Equal)
        ))),
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators handled above"),
    }
}

/// Strings compare lexicographically, everything else numerically.
/// Values without a numeric meaning are unordered.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(left)?.partial_cmp(&to_number(right)?),
    }
}

enum Key {
    Field(String),
    Index(usize),
}

fn place_keys(place: &Place, e_ctx: &EvaluationContext) -> Result<Vec<Key>, ExprError> {
    place
        .path
        .iter()
        .map(|segment| match segment {
            PathSegment::Key(k) => Ok(Key::Field(k.clone())),
            PathSegment::Computed(expr) => {
                let v = evaluate(expr, e_ctx)?;
                Ok(match (&v, array_index(&v)) {
                    (Value::Number(_), Some(i)) => Key::Index(i),
                    _ => Key::Field(value::to_string(&v)),
                })
            }
        })
        .collect()
}

fn assign(scope: &mut Scope, root: &str, keys: &[Key], value: Value) -> Result<(), ExprError> {
    let Some((last, parents)) = keys.split_last() else {
        scope.set(root, value);
        return Ok(());
    };

    if !scope.contains(root) {
        scope.set(root, Value::Object(Map::new()));
    }
    let mut current = scope
        .get_mut(root)
        .ok_or_else(|| ExprError::Assignment(root.to_string()))?;
    for key in parents {
        current = slot(current, key, root)?;
    }
    *slot(current, last, root)? = value;
    Ok(())
}

/// Returns the slot a key addresses, creating missing object fields.
fn slot<'v>(target: &'v mut Value, key: &Key, root: &str) -> Result<&'v mut Value, ExprError> {
    if target.is_null() {
        *target = Value::Object(Map::new());
    }
    match (target, key) {
        (Value::Object(map), Key::Field(k)) => Ok(map.entry(k.clone()).or_insert(Value::Null)),
        (Value::Object(map), Key::Index(i)) => {
            Ok(map.entry(i.to_string()).or_insert(Value::Null))
        }
        (Value::Array(items), Key::Index(i)) => {
            if *i == items.len() {
                items.push(Value::Null);
            }
            let len = items.len();
            items.get_mut(*i).ok_or_else(|| {
                ExprError::Assignment(format!("{}: index {} out of bounds ({})", root, i, len))
            })
        }
        (other, _) => Err(ExprError::Assignment(format!(
            "{}: cannot set a property on {}",
            root,
            value::type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_expression, parse_script};
    use serde_json::json;

    fn eval(source: &str, scope: Value) -> Result<Value, ExprError> {
        let scope = Scope::try_from(scope).unwrap();
        let funcs = FunctionRegistry::default();
        let e_ctx = EvaluationContext {
            scope: &scope,
            functions: &funcs,
        };
        evaluate(&parse_expression(source)?, &e_ctx)
    }

    #[test]
    fn test_eval_member_and_index() {
        let data = json!({ "orders": [ { "id": "A" }, { "id": "B" } ] });
        assert_eq!(eval("orders[1].id", data.clone()).unwrap(), json!("B"));
        assert_eq!(eval("orders.length", data.clone()).unwrap(), json!(2));
        assert_eq!(eval("orders[5].id", data).unwrap(), Value::Null);
    }

    #[test]
    fn test_eval_unknown_identifier_is_null() {
        assert_eq!(eval("missing.deeply.nested", json!({})).unwrap(), Value::Null);
    }

    #[test]
    fn test_eval_arithmetic() {
        assert_eq!(eval("i * 2 + 1", json!({ "i": 3 })).unwrap(), json!(7));
        assert_eq!(eval("7 / 2", json!({})).unwrap(), json!(3.5));
        assert_eq!(eval("7 % 4", json!({})).unwrap(), json!(3));
        assert_eq!(eval("-(2 - 5)", json!({})).unwrap(), json!(3));
    }

    #[test]
    fn test_eval_string_concatenation() {
        assert_eq!(
            eval("'Item ' + i", json!({ "i": 2 })).unwrap(),
            json!("Item 2")
        );
    }

    #[test]
    fn test_eval_division_by_zero_is_type_error() {
        assert!(matches!(eval("1 / 0", json!({})), Err(ExprError::Type(_))));
    }

    #[test]
    fn test_eval_arithmetic_on_object_is_type_error() {
        assert!(matches!(
            eval("user * 2", json!({ "user": { "a": 1 } })),
            Err(ExprError::Type(_))
        ));
    }

    #[test]
    fn test_eval_logical_returns_operands() {
        assert_eq!(eval("name || 'guest'", json!({})).unwrap(), json!("guest"));
        assert_eq!(
            eval("user && user.name", json!({ "user": { "name": "Ada" } })).unwrap(),
            json!("Ada")
        );
        assert_eq!(eval("!user", json!({})).unwrap(), json!(true));
    }

    #[test]
    fn test_eval_comparisons() {
        assert_eq!(eval("a < b", json!({ "a": 1, "b": 2 })).unwrap(), json!(true));
        assert_eq!(eval("'b' >= 'a'", json!({})).unwrap(), json!(true));
        assert_eq!(eval("role == 'admin'", json!({ "role": "admin" })).unwrap(), json!(true));
        assert_eq!(eval("1 === '1'", json!({})).unwrap(), json!(false));
        assert_eq!(eval("{} < 1", json!({})).unwrap(), json!(false));
    }

    #[test]
    fn test_eval_ternary() {
        assert_eq!(
            eval("user.admin ? 'admin' : 'guest'", json!({ "user": { "admin": false } })).unwrap(),
            json!("guest")
        );
    }

    #[test]
    fn test_eval_unknown_function() {
        assert_eq!(
            eval("nope(1)", json!({})),
            Err(ExprError::UnknownFunction("nope".into()))
        );
    }

    #[test]
    fn test_execute_assignments_mutate_scope() {
        let mut scope = Scope::try_from(json!({ "count": 1 })).unwrap();
        let funcs = FunctionRegistry::default();
        let script = parse_script("count = count + 1; user.name = 'Ada'; list = [1]; list[1] = 2").unwrap();
        let result = execute(&script, &mut scope, &funcs).unwrap();

        assert_eq!(result, Value::Null);
        assert_eq!(scope.get("count"), Some(&json!(2)));
        assert_eq!(scope.get("user"), Some(&json!({ "name": "Ada" })));
        assert_eq!(scope.get("list"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_execute_return_stops_block() {
        let mut scope = Scope::new();
        let funcs = FunctionRegistry::default();
        let script = parse_script("x = 1; return x + 1; x = 5").unwrap();
        assert_eq!(execute(&script, &mut scope, &funcs).unwrap(), json!(2));
        assert_eq!(scope.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_execute_yields_trailing_expression() {
        let mut scope = Scope::new();
        let funcs = FunctionRegistry::default();
        let script = parse_script("x = 2; x * 3").unwrap();
        assert_eq!(execute(&script, &mut scope, &funcs).unwrap(), json!(6));

        let script = parse_script("x * 3; y = 1").unwrap();
        assert_eq!(execute(&script, &mut scope, &funcs).unwrap(), Value::Null);
    }

    #[test]
    fn test_execute_rejects_property_on_scalar() {
        let mut scope = Scope::try_from(json!({ "n": 3 })).unwrap();
        let funcs = FunctionRegistry::default();
        let script = parse_script("n.x = 1").unwrap();
        assert!(matches!(
            execute(&script, &mut scope, &funcs),
            Err(ExprError::Assignment(_))
        ));
    }
}
