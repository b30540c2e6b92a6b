//! Mapping specification builder
//!
//! A [`MappingSpec`] collects rules for one (source type, destination type)
//! pair. Each declaration is checked against the host's property directory
//! as it is made; [`seal`](MappingSpec::seal) adds implicit rules, runs the
//! [`Validator`] and yields an immutable [`Mapper`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use remap_core::{MappingSpec, Record, Value};
//! use remap_core::property::ValueType;
//! use remap_core::registry::{RecordSchema, SchemaRegistry};
//!
//! let registry = Arc::new(
//!     SchemaRegistry::new()
//!         .with(RecordSchema::new("Person")
//!             .property("name", ValueType::String)
//!             .property("age", ValueType::Int))
//!         .with(RecordSchema::new("PersonView")
//!             .property("full_name", ValueType::String)
//!             .property("age_group", ValueType::String)),
//! );
//!
//! let mapper = MappingSpec::new(registry, "Person", "PersonView")?
//!     .reassign("name").to("full_name")?
//!     .replace("age", "age_group")
//!     .with(|age| Value::from(if age.as_int() >= Some(18) { "adult" } else { "minor" }))?
//!     .seal()?;
//!
//! let view = mapper.transform(&Record::new("Person").with("name", "Al").with("age", 30))?;
//! assert_eq!(view.get("age_group"), Some(&Value::from("adult")));
//! # Ok::<(), remap_core::Error>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AccessError, BoxError, SpecificationError, ValidationError};
use crate::host::RecordHost;
use crate::mapper::Mapper;
use crate::property::{PropertyInfo, PropertyRef, ValueType};
use crate::rule::{CollectionTarget, ReplaceFn, TransformationRule};
use crate::validator::Validator;
use crate::value::Value;

/// Knobs that change how a spec is sealed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingOptions {
    /// Map still-unclaimed same-named properties automatically when sealing
    #[serde(default = "default_implicit_mapping")]
    pub implicit_mapping: bool,
}

fn default_implicit_mapping() -> bool {
    true
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            implicit_mapping: default_implicit_mapping(),
        }
    }
}

/// Rules under construction for one type pair
pub struct MappingSpec {
    host: Arc<dyn RecordHost>,
    source_type: String,
    destination_type: String,
    source_properties: Vec<PropertyInfo>,
    destination_properties: Vec<PropertyInfo>,
    rules: Vec<TransformationRule>,
    mappers: Vec<Mapper>,
    options: MappingOptions,
}

impl MappingSpec {
    /// Start a spec from `source_type` to `destination_type`.
    ///
    /// Both property directories are read once here and reused for every
    /// declaration on this spec.
    pub fn new(
        host: Arc<dyn RecordHost>,
        source_type: impl Into<String>,
        destination_type: impl Into<String>,
    ) -> Result<Self, SpecificationError> {
        let source_type = source_type.into();
        let destination_type = destination_type.into();
        let source_properties = directory(host.as_ref(), &source_type)?;
        let destination_properties = directory(host.as_ref(), &destination_type)?;

        Ok(Self {
            host,
            source_type,
            destination_type,
            source_properties,
            destination_properties,
            rules: Vec::new(),
            mappers: Vec::new(),
            options: MappingOptions::default(),
        })
    }

    /// Replace the sealing options
    pub fn with_options(mut self, options: MappingOptions) -> Self {
        self.options = options;
        self
    }

    /// Source record type
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// Destination record type
    pub fn destination_type(&self) -> &str {
        &self.destination_type
    }

    /// Rules declared so far
    pub fn rules(&self) -> &[TransformationRule] {
        &self.rules
    }

    /// Copy a property into the destination property of the same name
    pub fn map(self, property: &str) -> Result<Self, SpecificationError> {
        let source = self.source_ref(property)?;
        let destination = self.destination_ref(property)?;
        check_copy(&source, &destination)?;
        self.push(TransformationRule::Map {
            source,
            destination,
            implicit: false,
        })
    }

    /// Copy `source` into a differently named destination property
    pub fn reassign(self, source: &str) -> ReassignBuilder {
        ReassignBuilder {
            spec: self,
            source: source.to_string(),
        }
    }

    /// Compute `destination` from `source` with a function
    pub fn replace(self, source: &str, destination: &str) -> ReplaceBuilder {
        ReplaceBuilder {
            spec: self,
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    /// Mark a source property as intentionally unused
    pub fn omit_in_source(self, property: &str) -> Result<Self, SpecificationError> {
        let source = self.source_ref(property)?;
        self.push(TransformationRule::OmitSource { source })
    }

    /// Leave a destination property at its post-instantiation value
    pub fn omit_in_destination(self, property: &str) -> Result<Self, SpecificationError> {
        let destination = self.destination_ref(property)?;
        let defaulted = self
            .destination_properties
            .iter()
            .find(|p| p.name == property)
            .is_some_and(PropertyInfo::is_defaulted);
        if !defaulted {
            return Err(SpecificationError::NoDefault {
                property: destination,
            });
        }
        self.push(TransformationRule::OmitDestination { destination })
    }

    /// Register a nested mapper for implicit use.
    ///
    /// When sealing, same-named record properties (or collections of
    /// records) whose types match the mapper's pair are mapped through it.
    pub fn use_mapper(mut self, mapper: &Mapper) -> Result<Self, SpecificationError> {
        if self.registered(mapper.source_type(), mapper.destination_type()).is_some() {
            return Err(SpecificationError::DuplicateMapper {
                pair: mapper.type_pair(),
            });
        }
        self.mappers.push(mapper.clone());
        Ok(self)
    }

    /// Map an embedded record property through a nested mapper
    pub fn use_mapper_for(
        self,
        source: &str,
        destination: &str,
        mapper: &Mapper,
    ) -> Result<Self, SpecificationError> {
        let source = self.source_ref(source)?;
        let destination = self.destination_ref(destination)?;
        let from = record_type(&source)?;
        let to = record_type(&destination)?;
        check_mapper(mapper, from, to)?;
        self.push(TransformationRule::UseMapper {
            mapper: mapper.clone(),
            source,
            destination,
            implicit: false,
        })
    }

    /// Map a collection property element-wise through a nested mapper.
    ///
    /// A `list<T>` or `set<T>` destination fixes the kind of the result now;
    /// a `collection<T>` destination takes the kind of the collection the
    /// fresh destination instance holds.
    pub fn map_collection(
        self,
        source: &str,
        destination: &str,
        mapper: &Mapper,
    ) -> Result<Self, SpecificationError> {
        let source = self.source_ref(source)?;
        let destination = self.destination_ref(destination)?;
        let (_, from_element) = collection_type(&source)?;
        let (kind, to_element) = collection_type(&destination)?;
        let from = element_record_type(&source, from_element)?;
        let to = element_record_type(&destination, to_element)?;
        check_mapper(mapper, from, to)?;
        let target = kind.map_or(CollectionTarget::Runtime, CollectionTarget::Static);
        self.push(TransformationRule::MapCollection {
            mapper: mapper.clone(),
            source,
            destination,
            target,
            implicit: false,
        })
    }

    /// Validate the rules and freeze them into a [`Mapper`]
    pub fn seal(mut self) -> Result<Mapper, ValidationError> {
        let declared = self.rules.len();
        if self.options.implicit_mapping {
            self.add_implicit_rules();
        }

        Validator::new(
            &self.source_type,
            &self.destination_type,
            &self.source_properties,
            &self.destination_properties,
            &self.rules,
        )
        .validate()?;

        tracing::debug!(
            source = %self.source_type,
            destination = %self.destination_type,
            declared,
            implicit = self.rules.len() - declared,
            "sealed mapping"
        );
        Ok(Mapper::new(
            self.source_type,
            self.destination_type,
            self.rules,
            self.host,
        ))
    }

    fn push(mut self, rule: TransformationRule) -> Result<Self, SpecificationError> {
        for existing in &self.rules {
            if let (Some(claimed), Some(wanted)) = (existing.source(), rule.source())
                && claimed == wanted
            {
                return Err(SpecificationError::DuplicateSource {
                    property: wanted.clone(),
                    existing: existing.to_string(),
                });
            }
            if let (Some(claimed), Some(wanted)) = (existing.destination(), rule.destination())
                && claimed == wanted
            {
                return Err(SpecificationError::DuplicateDestination {
                    property: wanted.clone(),
                    existing: existing.to_string(),
                });
            }
        }
        tracing::trace!(rule = %rule, "declared rule");
        self.rules.push(rule);
        Ok(self)
    }

    fn source_ref(&self, name: &str) -> Result<PropertyRef, SpecificationError> {
        let info = find(&self.source_type, &self.source_properties, name)?;
        if !info.readable {
            return Err(SpecificationError::NotReadable {
                type_name: self.source_type.clone(),
                property: name.to_string(),
            });
        }
        Ok(PropertyRef::of(&self.source_type, info))
    }

    fn destination_ref(&self, name: &str) -> Result<PropertyRef, SpecificationError> {
        let info = find(&self.destination_type, &self.destination_properties, name)?;
        if !info.writable {
            return Err(SpecificationError::NotWritable {
                type_name: self.destination_type.clone(),
                property: name.to_string(),
            });
        }
        Ok(PropertyRef::of(&self.destination_type, info))
    }

    fn registered(&self, source_type: &str, destination_type: &str) -> Option<&Mapper> {
        self.mappers.iter().find(|m| {
            m.source_type() == source_type && m.destination_type() == destination_type
        })
    }

    fn add_implicit_rules(&mut self) {
        let claimed_sources: HashSet<String> = self
            .rules
            .iter()
            .filter_map(|r| r.source().map(|p| p.name().to_string()))
            .collect();
        let claimed_destinations: HashSet<String> = self
            .rules
            .iter()
            .filter_map(|r| r.destination().map(|p| p.name().to_string()))
            .collect();

        let mut implicit = Vec::new();
        for destination in &self.destination_properties {
            if !destination.writable || claimed_destinations.contains(&destination.name) {
                continue;
            }
            let Some(source) = self.source_properties.iter().find(|p| {
                p.name == destination.name
                    && p.readable
                    && !claimed_sources.contains(&p.name)
            }) else {
                continue;
            };
            if let Some(rule) = self.implicit_rule(source, destination) {
                tracing::trace!(rule = %rule, "implicit rule");
                implicit.push(rule);
            }
        }
        self.rules.extend(implicit);
    }

    fn implicit_rule(
        &self,
        source: &PropertyInfo,
        destination: &PropertyInfo,
    ) -> Option<TransformationRule> {
        let from = PropertyRef::of(&self.source_type, source);
        let to = PropertyRef::of(&self.destination_type, destination);

        if let (Some(a), Some(b)) = (
            source.value_type.record_name(),
            destination.value_type.record_name(),
        ) && let Some(mapper) = self.registered(a, b)
        {
            return Some(TransformationRule::UseMapper {
                source: from,
                destination: to,
                mapper: mapper.clone(),
                implicit: true,
            });
        }

        if let (Some((_, a)), Some((kind, b))) = (
            source.value_type.collection(),
            destination.value_type.collection(),
        ) && let (Some(a), Some(b)) = (a.record_name(), b.record_name())
            && let Some(mapper) = self.registered(a, b)
        {
            return Some(TransformationRule::MapCollection {
                source: from,
                destination: to,
                mapper: mapper.clone(),
                target: kind.map_or(CollectionTarget::Runtime, CollectionTarget::Static),
                implicit: true,
            });
        }

        source
            .value_type
            .is_compatible_with(&destination.value_type)
            .then_some(TransformationRule::Map {
                source: from,
                destination: to,
                implicit: true,
            })
    }
}

/// Pending `reassign` declaration awaiting its destination
#[must_use = "call `to` to declare the destination property"]
pub struct ReassignBuilder {
    spec: MappingSpec,
    source: String,
}

impl ReassignBuilder {
    /// Name the destination property
    pub fn to(self, destination: &str) -> Result<MappingSpec, SpecificationError> {
        let source = self.spec.source_ref(&self.source)?;
        let destination = self.spec.destination_ref(destination)?;
        check_copy(&source, &destination)?;
        self.spec.push(TransformationRule::Reassign {
            source,
            destination,
        })
    }
}

/// Pending `replace` declaration awaiting its function
#[must_use = "call one of the `with` methods to supply the transformation"]
pub struct ReplaceBuilder {
    spec: MappingSpec,
    source: String,
    destination: String,
}

impl ReplaceBuilder {
    /// Always apply `f`, also to an absent source value
    pub fn with<F>(self, f: F) -> Result<MappingSpec, SpecificationError>
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.with_function(Arc::new(move |value| Ok(f(value))), false)
    }

    /// Apply `f` unless the source value is absent
    pub fn with_skip_when_null<F>(self, f: F) -> Result<MappingSpec, SpecificationError>
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.with_function(Arc::new(move |value| Ok(f(value))), true)
    }

    /// Always apply the fallible `f`
    pub fn try_with<F, E>(self, f: F) -> Result<MappingSpec, SpecificationError>
    where
        F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.with_function(Arc::new(move |value| f(value).map_err(Into::into)), false)
    }

    /// Apply the fallible `f` unless the source value is absent
    pub fn try_with_skip_when_null<F, E>(self, f: F) -> Result<MappingSpec, SpecificationError>
    where
        F: Fn(Value) -> Result<Value, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.with_function(Arc::new(move |value| f(value).map_err(Into::into)), true)
    }

    /// Use an already shared function
    pub fn with_function(
        self,
        function: ReplaceFn,
        skip_when_null: bool,
    ) -> Result<MappingSpec, SpecificationError> {
        let source = self.spec.source_ref(&self.source)?;
        let destination = self.spec.destination_ref(&self.destination)?;
        self.spec.push(TransformationRule::Replace {
            source,
            destination,
            function,
            skip_when_null,
        })
    }
}

fn directory(host: &dyn RecordHost, type_name: &str) -> Result<Vec<PropertyInfo>, SpecificationError> {
    host.properties_of(type_name).map_err(|source| match source {
        AccessError::UnknownType { .. } => SpecificationError::UnknownType {
            type_name: type_name.to_string(),
        },
        source => SpecificationError::Directory {
            type_name: type_name.to_string(),
            source,
        },
    })
}

fn find<'a>(
    type_name: &str,
    properties: &'a [PropertyInfo],
    name: &str,
) -> Result<&'a PropertyInfo, SpecificationError> {
    properties
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| SpecificationError::UnknownProperty {
            type_name: type_name.to_string(),
            property: name.to_string(),
        })
}

fn check_copy(source: &PropertyRef, destination: &PropertyRef) -> Result<(), SpecificationError> {
    if source.value_type().is_compatible_with(destination.value_type()) {
        return Ok(());
    }
    Err(SpecificationError::IncompatibleTypes {
        from: source.clone(),
        from_type: source.value_type().to_string(),
        to: destination.clone(),
        to_type: destination.value_type().to_string(),
    })
}

fn record_type(property: &PropertyRef) -> Result<&str, SpecificationError> {
    property
        .value_type()
        .record_name()
        .ok_or_else(|| SpecificationError::NotARecord {
            property: property.clone(),
            declared: property.value_type().to_string(),
        })
}

fn collection_type(
    property: &PropertyRef,
) -> Result<(Option<crate::property::CollectionKind>, &ValueType), SpecificationError> {
    if let Some(collection) = property.value_type().collection() {
        return Ok(collection);
    }
    let declared = property.value_type().to_string();
    match property.value_type().base() {
        ValueType::Map(_) => Err(SpecificationError::UnsupportedCollection {
            property: property.clone(),
            declared,
        }),
        _ => Err(SpecificationError::NotACollection {
            property: property.clone(),
            declared,
        }),
    }
}

fn element_record_type<'a>(
    property: &PropertyRef,
    element: &'a ValueType,
) -> Result<&'a str, SpecificationError> {
    element
        .record_name()
        .ok_or_else(|| SpecificationError::NotARecord {
            property: property.clone(),
            declared: property.value_type().to_string(),
        })
}

fn check_mapper(mapper: &Mapper, from: &str, to: &str) -> Result<(), SpecificationError> {
    if mapper.source_type() == from && mapper.destination_type() == to {
        return Ok(());
    }
    Err(SpecificationError::MapperMismatch {
        required: format!("{from} -> {to}"),
        found: mapper.type_pair(),
    })
}
