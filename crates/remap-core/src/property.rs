//! Property model
//!
//! Record types are described by the host as a list of [`PropertyInfo`]s.
//! A [`PropertyRef`] addresses one property of one type and is what rules
//! point at on either side of a mapping.
//!
//! # Type Syntax
//!
//! Value types are written the same way in code, configuration and error
//! messages:
//!
//! ```text
//! bool  char  int  float  string     scalars
//! Address                            record type by name
//! int?  Address?                     optional counterpart
//! list<T>  set<T>                    collections with a fixed kind
//! collection<T>                      kind decided by the destination instance
//! map<T>                             string-keyed dictionary
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::value::Value;

/// Structural kind of a collection value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Ordered sequence, duplicates kept
    List,
    /// Duplicate-free collection
    Set,
}

impl CollectionKind {
    /// Empty value of this kind
    pub fn empty(self) -> Value {
        match self {
            Self::List => Value::List(Vec::new()),
            Self::Set => Value::Set(Default::default()),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => f.write_str("list"),
            Self::Set => f.write_str("set"),
        }
    }
}

/// Declared type of a property value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `string`
    String,
    /// A record type, by name
    Record(String),
    /// `T?` - the nullable counterpart of `T`
    Optional(Box<ValueType>),
    /// `list<T>`
    List(Box<ValueType>),
    /// `set<T>`
    Set(Box<ValueType>),
    /// `collection<T>` - list or set, depending on the instance
    Collection(Box<ValueType>),
    /// `map<T>`
    Map(Box<ValueType>),
}

impl ValueType {
    /// Wrap in an optional layer unless already optional
    pub fn optional(self) -> Self {
        match self {
            Self::Optional(_) => self,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Whether the type admits an absent value
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// The type with one optional layer stripped
    pub fn base(&self) -> &ValueType {
        match self {
            Self::Optional(inner) => inner,
            other => other,
        }
    }

    /// Record type name, looking through an optional layer
    pub fn record_name(&self) -> Option<&str> {
        match self.base() {
            Self::Record(name) => Some(name),
            _ => None,
        }
    }

    /// Element type and statically known kind of a collection type.
    ///
    /// Returns `None` for anything that is not a list, set or abstract
    /// collection. The kind is `None` for `collection<T>`.
    pub fn collection(&self) -> Option<(Option<CollectionKind>, &ValueType)> {
        match self.base() {
            Self::List(element) => Some((Some(CollectionKind::List), element)),
            Self::Set(element) => Some((Some(CollectionKind::Set), element)),
            Self::Collection(element) => Some((None, element)),
            _ => None,
        }
    }

    /// Whether values can be copied from `self` to `other` as-is.
    ///
    /// Types are compatible when they are equal after stripping an optional
    /// layer from either side. Record types only match themselves.
    pub fn is_compatible_with(&self, other: &ValueType) -> bool {
        self.base() == other.base()
    }

    /// Whether a property of this type can hold `value`
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Optional(_), Value::Null) => true,
            (Self::Optional(inner), value) => inner.accepts(value),
            (Self::Bool, Value::Bool(_))
            | (Self::Char, Value::Char(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::String, Value::String(_)) => true,
            (Self::Record(name), Value::Record(record)) => record.type_name() == name,
            (Self::List(element) | Self::Collection(element), Value::List(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (Self::Set(element) | Self::Collection(element), Value::Set(items)) => {
                items.iter().all(|item| element.accepts(item))
            }
            (Self::Map(element), Value::Map(entries)) => {
                entries.values().all(|item| element.accepts(item))
            }
            _ => false,
        }
    }

    /// Value a freshly instantiated record holds, if it follows from the type alone.
    ///
    /// Records and abstract collections need the host to decide.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Optional(_) => Some(Value::Null),
            Self::Bool => Some(Value::Bool(false)),
            Self::Char => Some(Value::Char('\0')),
            Self::Int => Some(Value::Int(0)),
            Self::Float => Some(Value::Float(0.0)),
            Self::String => Some(Value::String(String::new())),
            Self::List(_) => Some(CollectionKind::List.empty()),
            Self::Set(_) => Some(CollectionKind::Set.empty()),
            Self::Map(_) => Some(Value::Map(Default::default())),
            Self::Record(_) | Self::Collection(_) => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Char => f.write_str("char"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::Record(name) => f.write_str(name),
            Self::Optional(inner) => write!(f, "{inner}?"),
            Self::List(element) => write!(f, "list<{element}>"),
            Self::Set(element) => write!(f, "set<{element}>"),
            Self::Collection(element) => write!(f, "collection<{element}>"),
            Self::Map(element) => write!(f, "map<{element}>"),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty type".to_string());
        }
        if let Some(inner) = s.strip_suffix('?') {
            let inner: ValueType = inner.parse()?;
            if inner.is_optional() {
                return Err(format!("'{s}' is optional twice"));
            }
            return Ok(inner.optional());
        }
        if let Some((head, rest)) = s.split_once('<') {
            let element = rest
                .strip_suffix('>')
                .ok_or_else(|| format!("unclosed '<' in '{s}'"))?
                .parse::<ValueType>()
                .map(Box::new)?;
            return match head.trim() {
                "list" => Ok(Self::List(element)),
                "set" => Ok(Self::Set(element)),
                "collection" => Ok(Self::Collection(element)),
                "map" => Ok(Self::Map(element)),
                other => Err(format!("unknown generic type '{other}'")),
            };
        }
        match s {
            "bool" => Ok(Self::Bool),
            "char" => Ok(Self::Char),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "string" => Ok(Self::String),
            name if name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') => {
                Ok(Self::Record(name.to_string()))
            }
            other => Err(format!("invalid type '{other}'")),
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}

/// One property as reported by a property directory
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    /// Property name
    pub name: String,
    /// Declared value type
    pub value_type: ValueType,
    /// Whether a read accessor exists
    pub readable: bool,
    /// Whether a write accessor exists
    pub writable: bool,
    /// Value of the property in a freshly instantiated record
    pub default: Option<Value>,
}

impl PropertyInfo {
    /// A readable and writable property with the type's own default
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            default: value_type.default_value(),
            value_type,
            readable: true,
            writable: true,
        }
    }

    /// Drop the write accessor
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Drop the read accessor
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Override the instantiation default
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Whether a fresh instance holds a deterministic value for this property
    pub fn is_defaulted(&self) -> bool {
        self.value_type.is_optional() || self.default.is_some()
    }
}

/// Immutable address of a property: owning type, name and declared type.
///
/// Equality and hashing only consider the owner and the name.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct PropertyRef {
    owner: String,
    name: String,
    value_type: ValueType,
}

impl PropertyRef {
    /// Create a reference to `owner.name`
    pub fn new(owner: impl Into<String>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            value_type,
        }
    }

    /// Reference a property reported by a directory
    pub fn of(owner: &str, info: &PropertyInfo) -> Self {
        Self::new(owner, info.name.clone(), info.value_type.clone())
    }

    /// Owning record type
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }
}

impl PartialEq for PropertyRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}

impl Hash for PropertyRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property '{}' in {}", self.name, self.owner)
    }
}
