//! The variable scope expressions are evaluated against.
use crate::error::ExprError;
use serde_json::{Map, Value};

/// A mutable mapping from variable name to value.
///
/// One scope lives for one whole render: repeats and imports share it, and
/// writes made by one expression are visible to every later one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    vars: Map<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.vars.get_mut(name)
    }

    /// Sets a variable, returning the previous value if there was one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    /// The whole scope as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.vars.clone())
    }
}

impl From<Map<String, Value>> for Scope {
    fn from(vars: Map<String, Value>) -> Self {
        Self { vars }
    }
}

impl TryFrom<Value> for Scope {
    type Error = ExprError;

    /// Only JSON objects (and `null`, as an empty scope) can become a scope.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(vars) => Ok(Self { vars }),
            Value::Null => Ok(Self::new()),
            other => Err(ExprError::Type(format!(
                "scope must be an object, got {}",
                crate::value::type_name(&other)
            ))),
        }
    }
}
