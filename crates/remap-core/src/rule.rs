//! Transformation rules
//!
//! A mapping is an ordered list of [`TransformationRule`]s, one per source
//! and destination property. Each rule knows how to move its value from a
//! source record into a destination record.
//!
//! # Rule Kinds
//!
//! - `map` - copy a same-named property with a compatible type
//! - `reassign` - copy into a differently named property
//! - `replace` - compute the destination value with a function
//! - `omit_in_source` - source property intentionally unused
//! - `omit_in_destination` - destination property keeps its default
//! - `use_mapper` - map an embedded record with a nested mapper
//! - `map_collection` - map each element of a collection with a nested mapper

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, ExecutionError};
use crate::host::RecordHost;
use crate::mapper::Mapper;
use crate::property::{CollectionKind, PropertyRef};
use crate::value::{Record, Value, ValueSet};

/// Caller-supplied function used by `replace` rules
pub type ReplaceFn = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// Discriminant of a [`TransformationRule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Same-name copy
    Map,
    /// Function-computed value
    Replace,
    /// Copy across names
    Reassign,
    /// Unused source property
    #[serde(rename = "omit_in_source")]
    OmitSource,
    /// Untouched destination property
    #[serde(rename = "omit_in_destination")]
    OmitDestination,
    /// Nested record mapping
    UseMapper,
    /// Element-wise collection mapping
    MapCollection,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Map => "map",
            Self::Replace => "replace",
            Self::Reassign => "reassign",
            Self::OmitSource => "omit_in_source",
            Self::OmitDestination => "omit_in_destination",
            Self::UseMapper => "use_mapper",
            Self::MapCollection => "map_collection",
        };
        f.write_str(name)
    }
}

/// How a `map_collection` rule picks the kind of the collection it builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionTarget {
    /// Fixed by the declared destination type
    Static(CollectionKind),
    /// Read from the destination instance when the rule runs
    Runtime,
}

impl fmt::Display for CollectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(kind) => write!(f, "{kind}"),
            Self::Runtime => f.write_str("instance kind"),
        }
    }
}

/// One declared transformation from zero-or-one source property to
/// zero-or-one destination property
#[derive(Clone)]
pub enum TransformationRule {
    /// Copy a same-named property
    Map {
        /// Source property
        source: PropertyRef,
        /// Destination property
        destination: PropertyRef,
        /// Added automatically at seal time
        implicit: bool,
    },

    /// Destination value computed from the source value
    Replace {
        /// Source property
        source: PropertyRef,
        /// Destination property
        destination: PropertyRef,
        /// The transformation
        function: ReplaceFn,
        /// Leave the destination untouched when the source is absent
        skip_when_null: bool,
    },

    /// Copy into a differently named property
    Reassign {
        /// Source property
        source: PropertyRef,
        /// Destination property
        destination: PropertyRef,
    },

    /// Source property deliberately not consumed
    OmitSource {
        /// Source property
        source: PropertyRef,
    },

    /// Destination property deliberately left at its default
    OmitDestination {
        /// Destination property
        destination: PropertyRef,
    },

    /// Embedded record mapped by a nested mapper
    UseMapper {
        /// Source property
        source: PropertyRef,
        /// Destination property
        destination: PropertyRef,
        /// Sealed mapper for the record types
        mapper: Mapper,
        /// Added automatically at seal time
        implicit: bool,
    },

    /// Collection mapped element-wise by a nested mapper
    MapCollection {
        /// Source property
        source: PropertyRef,
        /// Destination property
        destination: PropertyRef,
        /// Sealed mapper for the element types
        mapper: Mapper,
        /// Kind of the collection to build
        target: CollectionTarget,
        /// Added automatically at seal time
        implicit: bool,
    },
}

/// Serializable description of a rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSummary {
    /// Rule kind
    pub kind: RuleKind,
    /// Source property name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Destination property name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    /// Replace sub-mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_when_null: Option<bool>,
    /// Nested mapper type pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapper: Option<String>,
    /// Whether the rule was added at seal time
    pub implicit: bool,
}

impl TransformationRule {
    /// The rule's kind
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Map { .. } => RuleKind::Map,
            Self::Replace { .. } => RuleKind::Replace,
            Self::Reassign { .. } => RuleKind::Reassign,
            Self::OmitSource { .. } => RuleKind::OmitSource,
            Self::OmitDestination { .. } => RuleKind::OmitDestination,
            Self::UseMapper { .. } => RuleKind::UseMapper,
            Self::MapCollection { .. } => RuleKind::MapCollection,
        }
    }

    /// Source property, absent for `omit_in_destination`
    pub fn source(&self) -> Option<&PropertyRef> {
        match self {
            Self::Map { source, .. }
            | Self::Replace { source, .. }
            | Self::Reassign { source, .. }
            | Self::OmitSource { source }
            | Self::UseMapper { source, .. }
            | Self::MapCollection { source, .. } => Some(source),
            Self::OmitDestination { .. } => None,
        }
    }

    /// Destination property, absent for `omit_in_source`
    pub fn destination(&self) -> Option<&PropertyRef> {
        match self {
            Self::Map { destination, .. }
            | Self::Replace { destination, .. }
            | Self::Reassign { destination, .. }
            | Self::OmitDestination { destination }
            | Self::UseMapper { destination, .. }
            | Self::MapCollection { destination, .. } => Some(destination),
            Self::OmitSource { .. } => None,
        }
    }

    /// Replace sub-mode; `None` for other kinds
    pub fn skip_when_null(&self) -> Option<bool> {
        match self {
            Self::Replace { skip_when_null, .. } => Some(*skip_when_null),
            _ => None,
        }
    }

    /// Whether the rule was added by implicit mapping rather than declared
    pub fn is_implicit(&self) -> bool {
        match self {
            Self::Map { implicit, .. }
            | Self::UseMapper { implicit, .. }
            | Self::MapCollection { implicit, .. } => *implicit,
            _ => false,
        }
    }

    /// Nested mapper, for `use_mapper` and `map_collection`
    pub fn mapper(&self) -> Option<&Mapper> {
        match self {
            Self::UseMapper { mapper, .. } | Self::MapCollection { mapper, .. } => Some(mapper),
            _ => None,
        }
    }

    /// Whether the rule does anything when a record is transformed
    pub fn is_executable(&self) -> bool {
        !matches!(self, Self::OmitSource { .. } | Self::OmitDestination { .. })
    }

    /// Serializable description
    pub fn summary(&self) -> RuleSummary {
        RuleSummary {
            kind: self.kind(),
            source: self.source().map(|p| p.name().to_string()),
            destination: self.destination().map(|p| p.name().to_string()),
            skip_when_null: self.skip_when_null(),
            mapper: self.mapper().map(Mapper::type_pair),
            implicit: self.is_implicit(),
        }
    }

    /// Move the value of this rule from `source` into `destination`
    pub(crate) fn apply(
        &self,
        host: &dyn RecordHost,
        source: &Record,
        destination: &mut Record,
    ) -> Result<(), ExecutionError> {
        match self {
            Self::OmitSource { .. } | Self::OmitDestination { .. } => Ok(()),

            Self::Map {
                source: from,
                destination: to,
                ..
            }
            | Self::Reassign {
                source: from,
                destination: to,
            } => {
                let value = read(host, from, source)?;
                write(host, to, destination, value)
            }

            Self::Replace {
                source: from,
                destination: to,
                function,
                skip_when_null,
            } => {
                let value = read(host, from, source)?;
                if value.is_null() && *skip_when_null {
                    return Ok(());
                }
                let value = function(value).map_err(|e| ExecutionError::Replace {
                    rule: self.to_string(),
                    source: e,
                })?;
                write(host, to, destination, value)
            }

            Self::UseMapper {
                source: from,
                destination: to,
                mapper,
                ..
            } => {
                let value = match read(host, from, source)? {
                    Value::Null => Value::Null,
                    Value::Record(nested) => Value::Record(
                        mapper
                            .transform(&nested)
                            .map_err(|e| nested_failure(from, e))?,
                    ),
                    other => {
                        return Err(ExecutionError::UnexpectedValue {
                            property: from.clone(),
                            expected: "record".to_string(),
                            found: other.kind().to_string(),
                        });
                    }
                };
                write(host, to, destination, value)
            }

            Self::MapCollection {
                source: from,
                destination: to,
                mapper,
                target,
                ..
            } => {
                let items = match read(host, from, source)? {
                    Value::Null => return write(host, to, destination, Value::Null),
                    Value::List(items) => items,
                    Value::Set(items) => items.into_iter().collect(),
                    other => {
                        return Err(ExecutionError::UnexpectedValue {
                            property: from.clone(),
                            expected: "collection".to_string(),
                            found: other.kind().to_string(),
                        });
                    }
                };
                let kind = match target {
                    CollectionTarget::Static(kind) => *kind,
                    CollectionTarget::Runtime => classify_instance(to, destination)?,
                };
                let mapped = items
                    .into_iter()
                    .map(|item| map_element(mapper, from, item))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = match kind {
                    CollectionKind::List => Value::List(mapped),
                    CollectionKind::Set => Value::Set(mapped.into_iter().collect::<ValueSet>()),
                };
                write(host, to, destination, value)
            }
        }
    }
}

fn read(host: &dyn RecordHost, property: &PropertyRef, record: &Record) -> Result<Value, ExecutionError> {
    host.read(property.owner(), record, property.name())
        .map_err(|source| ExecutionError::Read {
            property: property.clone(),
            source,
        })
}

fn write(
    host: &dyn RecordHost,
    property: &PropertyRef,
    record: &mut Record,
    value: Value,
) -> Result<(), ExecutionError> {
    tracing::trace!(property = %property, kind = value.kind(), "writing value");
    host.write(property.owner(), record, property.name(), value)
        .map_err(|source| ExecutionError::Write {
            property: property.clone(),
            source,
        })
}

fn nested_failure(property: &PropertyRef, error: ExecutionError) -> ExecutionError {
    ExecutionError::Nested {
        property: property.clone(),
        source: Box::new(error),
    }
}

fn map_element(mapper: &Mapper, property: &PropertyRef, item: Value) -> Result<Value, ExecutionError> {
    match item {
        Value::Null => Ok(Value::Null),
        Value::Record(element) => mapper
            .transform(&element)
            .map(Value::Record)
            .map_err(|e| nested_failure(property, e)),
        other => Err(ExecutionError::UnexpectedValue {
            property: property.clone(),
            expected: "record element".to_string(),
            found: other.kind().to_string(),
        }),
    }
}

/// Decide list vs set from the collection the fresh destination instance holds
fn classify_instance(
    property: &PropertyRef,
    destination: &Record,
) -> Result<CollectionKind, ExecutionError> {
    match destination.get(property.name()) {
        Some(Value::List(_)) => Ok(CollectionKind::List),
        Some(Value::Set(_)) => Ok(CollectionKind::Set),
        other => Err(ExecutionError::UnsupportedCollection {
            property: property.clone(),
            found: other.map_or("nothing", Value::kind).to_string(),
        }),
    }
}

impl fmt::Display for TransformationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map {
                source,
                destination,
                implicit,
            } => {
                write!(f, "Map {source} to {destination}")?;
                if *implicit {
                    f.write_str(" (implicit)")?;
                }
                Ok(())
            }
            Self::Replace {
                source,
                destination,
                skip_when_null,
                ..
            } => {
                if *skip_when_null {
                    write!(
                        f,
                        "Replace (skipping when null) {source} with {destination} using transformation"
                    )
                } else {
                    write!(f, "Replace {source} with {destination} using transformation")
                }
            }
            Self::Reassign {
                source,
                destination,
            } => write!(f, "Reassign {source} to {destination}"),
            Self::OmitSource { source } => write!(f, "Omit in source {source}"),
            Self::OmitDestination { destination } => {
                write!(f, "Omit in destination {destination}")
            }
            Self::UseMapper {
                source,
                destination,
                mapper,
                implicit,
            } => {
                write!(
                    f,
                    "Map {source} to {destination} using mapper {}",
                    mapper.type_pair()
                )?;
                if *implicit {
                    f.write_str(" (implicit)")?;
                }
                Ok(())
            }
            Self::MapCollection {
                source,
                destination,
                mapper,
                target,
                implicit,
            } => {
                write!(
                    f,
                    "Map collection {source} to {destination} as {target} using mapper {}",
                    mapper.type_pair()
                )?;
                if *implicit {
                    f.write_str(" (implicit)")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for TransformationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransformationRule({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::map(RuleKind::Map)]
    #[case::replace(RuleKind::Replace)]
    #[case::reassign(RuleKind::Reassign)]
    #[case::omit_source(RuleKind::OmitSource)]
    #[case::omit_destination(RuleKind::OmitDestination)]
    #[case::use_mapper(RuleKind::UseMapper)]
    #[case::map_collection(RuleKind::MapCollection)]
    fn test_kind_serializes_as_config_key(#[case] kind: RuleKind) {
        let json = serde_json::to_value(kind).unwrap();
        assert_eq!(json, serde_json::Value::String(kind.to_string()));
    }
}
