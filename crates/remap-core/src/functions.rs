//! Named replace functions
//!
//! Declarative mappings cannot carry closures, so `replace` rules in
//! configuration refer to functions by name. [`FunctionRegistry`] resolves
//! those names.
//!
//! # Built-in Functions
//!
//! - `to_string` - render any present value as text
//! - `uppercase` / `lowercase` / `trim` - text normalization
//! - `parse_int` / `parse_float` - parse text into numbers
//! - `length` - length of a string or collection

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::BoxError;
use crate::rule::ReplaceFn;
use crate::value::Value;

/// Name → function table used when loading declarative mappings
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, ReplaceFn>,
}

impl FunctionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("to_string", |v| match v {
            Value::Null => Ok(Value::Null),
            other => Ok(Value::String(other.to_string())),
        });
        registry.register("uppercase", |v| map_text("uppercase", v, |s| s.to_uppercase()));
        registry.register("lowercase", |v| map_text("lowercase", v, |s| s.to_lowercase()));
        registry.register("trim", |v| map_text("trim", v, |s| s.trim().to_string()));
        registry.register("parse_int", |v| match v {
            Value::String(s) => Ok(Value::Int(s.trim().parse::<i64>()?)),
            other => pass_or_reject("parse_int", other),
        });
        registry.register("parse_float", |v| match v {
            Value::String(s) => Ok(Value::Float(s.trim().parse::<f64>()?)),
            other => pass_or_reject("parse_float", other),
        });
        registry.register("length", |v| {
            let len = match &v {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Set(items) => items.len(),
                Value::Map(entries) => entries.len(),
                other => return pass_or_reject("length", other.clone()),
            };
            Ok(Value::Int(i64::try_from(len)?))
        });
        registry
    }

    /// Add or replace a named function
    pub fn register<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<ReplaceFn> {
        self.functions.get(name).cloned()
    }

    /// Registered names in alphabetical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.functions.keys()).finish()
    }
}

fn map_text(name: &str, value: Value, f: impl Fn(&str) -> String) -> Result<Value, BoxError> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => pass_or_reject(name, other),
    }
}

/// Absent values pass through; anything else is the wrong input
fn pass_or_reject(name: &str, value: Value) -> Result<Value, BoxError> {
    match value {
        Value::Null => Ok(Value::Null),
        other => Err(format!("{name} cannot handle a {} value", other.kind()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("to_string", Value::Int(42), Value::from("42"))]
    #[case("uppercase", Value::from("abc"), Value::from("ABC"))]
    #[case("lowercase", Value::from("AbC"), Value::from("abc"))]
    #[case("trim", Value::from("  a b "), Value::from("a b"))]
    #[case("parse_int", Value::from(" 17"), Value::Int(17))]
    #[case("parse_float", Value::from("2.5"), Value::Float(2.5))]
    #[case("length", Value::from("héllo"), Value::Int(5))]
    #[case("length", Value::from(vec![1, 2, 3]), Value::Int(3))]
    #[case("uppercase", Value::Null, Value::Null)]
    fn test_builtin(#[case] name: &str, #[case] input: Value, #[case] expected: Value) {
        let f = FunctionRegistry::with_builtins().get(name).unwrap();
        assert_eq!(f(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_int_reports_bad_input() {
        let f = FunctionRegistry::with_builtins().get("parse_int").unwrap();
        assert!(f(Value::from("twelve")).is_err());
        assert!(f(Value::Bool(true)).is_err());
    }

    #[test]
    fn test_custom_function() {
        let mut registry = FunctionRegistry::new();
        registry.register("double", |v| Ok(Value::Int(v.as_int().unwrap_or(0) * 2)));
        assert_eq!(registry.get("double").unwrap()(Value::Int(4)).unwrap(), Value::Int(8));
        assert!(registry.get("to_string").is_none());
    }
}
