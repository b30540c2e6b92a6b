//! Runtime values and record instances

use indexmap::IndexSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

/// A property value as seen by accessors and replace functions.
///
/// `NaN` floats never compare equal, so a set may hold several of them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Single character
    Char(char),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Embedded record
    Record(Record),
    /// Ordered sequence
    List(Vec<Value>),
    /// Duplicate-free collection
    Set(ValueSet),
    /// String-keyed dictionary
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Whether the value is absent
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's shape, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Record(_) => "record",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
        }
    }

    /// Borrow as text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float content, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Boolean content
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Char(c) => c.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(n) => float_bits(*n).hash(state),
            Self::String(s) => s.hash(state),
            Self::Record(r) => r.hash(state),
            Self::List(items) => items.hash(state),
            Self::Set(items) => items.hash(state),
            Self::Map(entries) => entries.hash(state),
        }
    }
}

/// `0.0` and `-0.0` are equal and must hash alike
fn float_bits(n: f64) -> u64 {
    if n == 0.0 { 0 } else { n.to_bits() }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Record(r) => write!(f, "{r}"),
            Self::List(items) => write_items(f, "[", items.iter(), "]"),
            Self::Set(items) => write_items(f, "{", items.iter(), "}"),
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(close)
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<ValueSet> for Value {
    fn from(value: ValueSet) -> Self {
        Self::Set(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Duplicate-free collection of values.
///
/// Keeps first-insertion order for display and iteration; equality ignores order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ValueSet {
    items: IndexSet<Value>,
}

impl ValueSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value; returns `false` if an equal value was already present
    pub fn insert(&mut self, value: Value) -> bool {
        self.items.insert(value)
    }

    /// Membership test
    pub fn contains(&self, value: &Value) -> bool {
        self.items.contains(value)
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> indexmap::set::Iter<'_, Value> {
        self.items.iter()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.items.iter().all(|item| other.contains(item))
    }
}

impl Eq for ValueSet {}

// Order-independent, matching `PartialEq`.
impl Hash for ValueSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = self
            .items
            .iter()
            .map(|item| {
                let mut hasher = DefaultHasher::new();
                item.hash(&mut hasher);
                hasher.finish()
            })
            .fold(0u64, u64::wrapping_add);
        state.write_usize(self.len());
        state.write_u64(combined);
    }
}

impl FromIterator<Value> for ValueSet {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ValueSet {
    type Item = Value;
    type IntoIter = indexmap::set::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValueSet {
    type Item = &'a Value;
    type IntoIter = indexmap::set::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// An instance of a record type: the type name plus its field values.
///
/// Fields are raw storage; access rules (readability, writability, type
/// checks) are enforced by the host's accessors, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Record {
    #[serde(rename = "$type")]
    type_name: String,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Empty record of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Record type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Stored field value, if any
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Store a field value
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Iterate stored fields by name
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.type_name)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, " {name}: {value}")?;
        }
        f.write_str(" }")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_collapses_duplicates() {
        let set: ValueSet = [Value::Int(1), Value::Int(2), Value::Int(1)]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let a: ValueSet = [Value::from("x"), Value::from("y")].into_iter().collect();
        let b: ValueSet = [Value::from("y"), Value::from("x")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nested_sets_collapse_regardless_of_order() {
        let inner_a: ValueSet = [Value::Int(1), Value::Int(2)].into_iter().collect();
        let inner_b: ValueSet = [Value::Int(2), Value::Int(1)].into_iter().collect();
        let outer: ValueSet = [Value::Set(inner_a), Value::Set(inner_b)]
            .into_iter()
            .collect();
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn test_signed_zeros_are_one_member() {
        let set: ValueSet = [Value::Float(0.0), Value::Float(-0.0)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    fn row(id: i64) -> Value {
        Value::Record(Record::new("Row").with("id", id).with("label", format!("row {id}")))
    }

    #[test]
    fn test_large_set_of_records() {
        let set: ValueSet = (0..50_000).chain(0..50_000).map(row).collect();
        assert_eq!(set.len(), 50_000);
        assert_eq!(set.iter().next(), Some(&row(0)));
        assert!(set.contains(&row(49_999)));
    }

    #[test]
    fn test_record_display() {
        let record = Record::new("Person").with("name", "Al").with("age", 30);
        assert_eq!(record.to_string(), "Person { age: 30, name: Al }");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::from("a"));
    }

    #[test]
    fn test_record_serializes_with_type_tag() {
        let record = Record::new("Person")
            .with("name", "Al")
            .with("tags", vec!["a", "b"]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["$type"], "Person");
        assert_eq!(json["name"], "Al");
        assert_eq!(json["tags"][1], "b");
    }
}
