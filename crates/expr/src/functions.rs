//! Defines the registry and built-in implementations for expression functions.
use super::engine::EvaluationContext;
use crate::error::ExprError;
use crate::value::{self, from_f64, to_number, to_string};
use serde_json::{Value, json};
use std::collections::HashMap;

/// The signature for a function callable from templates.
pub type ExprFunction = fn(e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError>;

/// A registry to hold all available functions for the evaluation engine.
///
/// Templates can only call what is registered here; there is no other way
/// for an expression to reach host code.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, ExprFunction>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

impl FunctionRegistry {
    /// Creates a new, empty function registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registers a new function, replacing any previous one with the same name.
    pub fn register(&mut self, name: &str, func: ExprFunction) {
        self.functions.insert(name.to_lowercase(), func);
    }

    /// Finds a function by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&ExprFunction> {
        self.functions.get(&name.to_lowercase())
    }
}

fn arg_error(function: &str, message: impl Into<String>) -> ExprError {
    ExprError::Function {
        function: function.to_string(),
        message: message.into(),
    }
}

fn number_arg(function: &str, args: &[Value], index: usize) -> Result<f64, ExprError> {
    args.get(index)
        .and_then(to_number)
        .ok_or_else(|| arg_error(function, format!("argument {} must be a number", index + 1)))
}

// --- Built-in Function Implementations ---

fn upper(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    Ok(args
        .first()
        .map(|v| to_string(v).to_uppercase().into())
        .unwrap_or(Value::Null))
}

fn lower(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    Ok(args
        .first()
        .map(|v| to_string(v).to_lowercase().into())
        .unwrap_or(Value::Null))
}

fn concat(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    Ok(args.iter().map(to_string).collect::<String>().into())
}

fn contains(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let found = match (args.first(), args.get(1)) {
        (Some(Value::String(h)), Some(needle)) => h.contains(&to_string(needle)),
        (Some(Value::Array(items)), Some(needle)) => {
            items.iter().any(|item| value::loose_equals(item, needle))
        }
        (Some(Value::Object(map)), Some(needle)) => map.contains_key(&to_string(needle)),
        _ => false,
    };
    Ok(found.into())
}

fn count(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let len = match args.first() {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(map)) => map.len(),
        Some(Value::String(s)) => s.chars().count(),
        _ => 0,
    };
    Ok(json!(len))
}

fn join(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let separator = args.get(1).map(to_string).unwrap_or_else(|| ",".to_string());
    match args.first() {
        Some(Value::Array(items)) => Ok(items
            .iter()
            .map(to_string)
            .collect::<Vec<_>>()
            .join(&separator)
            .into()),
        Some(other) => Ok(to_string(other).into()),
        None => Ok(Value::Null),
    }
}

/// `default(value, fallback)`: the fallback when `value` is null or an empty string.
fn default(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let mut args = args.into_iter();
    let first = args.next().unwrap_or(Value::Null);
    let fallback = args.next().unwrap_or(Value::Null);
    Ok(match first {
        Value::Null => fallback,
        Value::String(ref s) if s.is_empty() => fallback,
        other => other,
    })
}

fn to_json(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let value = args.first().cloned().unwrap_or(Value::Null);
    serde_json::to_string(&value)
        .map(Value::String)
        .map_err(|e| arg_error("json", e.to_string()))
}

fn round(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let n = number_arg("round", &args, 0)?;
    let digits = if args.len() > 1 {
        number_arg("round", &args, 1)?.clamp(0.0, 15.0) as i32
    } else {
        0
    };
    let factor = 10f64.powi(digits);
    from_f64((n * factor).round() / factor).ok_or_else(|| arg_error("round", "result is not finite"))
}

fn floor(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let n = number_arg("floor", &args, 0)?;
    from_f64(n.floor()).ok_or_else(|| arg_error("floor", "result is not finite"))
}

fn ceil(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let n = number_arg("ceil", &args, 0)?;
    from_f64(n.ceil()).ok_or_else(|| arg_error("ceil", "result is not finite"))
}

/// HTML-escapes the string form of its argument.
fn escape(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    let raw = args.first().map(to_string).unwrap_or_default();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    Ok(out.into())
}

fn equals(_e_ctx: &EvaluationContext, args: Vec<Value>) -> Result<Value, ExprError> {
    if args.len() != 2 {
        return Ok(json!(false));
    }
    // String-based comparison, like the `==` operator on mixed types.
    Ok(json!(to_string(&args[0]) == to_string(&args[1])))
}

impl Default for FunctionRegistry {
    /// Creates a new registry populated with all built-in functions.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry.register("concat", concat);
        registry.register("contains", contains);
        registry.register("count", count);
        registry.register("len", count);
        registry.register("join", join);
        registry.register("default", default);
        registry.register("json", to_json);
        registry.register("round", round);
        registry.register("floor", floor);
        registry.register("ceil", ceil);
        registry.register("escape", escape);
        registry.register("equals", equals);
        registry
    }
}
