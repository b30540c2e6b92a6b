//! Schema-backed record host
//!
//! [`SchemaRegistry`] answers the directory and accessor contracts from
//! record schemas declared up front, either in code or through the
//! project configuration.
//!
//! # Example
//!
//! ```rust
//! use remap_core::registry::{RecordSchema, SchemaRegistry};
//! use remap_core::property::ValueType;
//!
//! let registry = SchemaRegistry::new().with(
//!     RecordSchema::new("Person")
//!         .property("name", ValueType::String)
//!         .property("nickname", ValueType::String.optional()),
//! );
//! assert!(registry.schema("Person").is_some());
//! ```

use std::collections::BTreeMap;

use crate::error::AccessError;
use crate::host::{PropertyDirectory, RecordAccessor};
use crate::property::{PropertyInfo, ValueType};
use crate::value::{Record, Value};

/// Nested non-optional records deeper than this fail to instantiate
const MAX_INSTANTIATION_DEPTH: usize = 32;

/// Declared shape of one record type
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    name: String,
    properties: Vec<PropertyInfo>,
}

impl RecordSchema {
    /// Schema without properties
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    /// Add a readable and writable property
    pub fn property(self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.with(PropertyInfo::new(name, value_type))
    }

    /// Add a fully described property, replacing any property of the same name
    pub fn with(mut self, info: PropertyInfo) -> Self {
        self.properties.retain(|p| p.name != info.name);
        self.properties.push(info);
        self
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared properties in declaration order
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// Look up one property
    pub fn get(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// In-memory host built from [`RecordSchema`]s
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, RecordSchema>,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, schema: RecordSchema) -> Self {
        self.register(schema);
        self
    }

    /// Add or replace a schema
    pub fn register(&mut self, schema: RecordSchema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    /// Look up a schema by type name
    pub fn schema(&self, type_name: &str) -> Option<&RecordSchema> {
        self.schemas.get(type_name)
    }

    /// Registered type names in alphabetical order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    fn require(&self, type_name: &str) -> Result<&RecordSchema, AccessError> {
        self.schemas
            .get(type_name)
            .ok_or_else(|| AccessError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    fn require_property<'a>(
        &self,
        schema: &'a RecordSchema,
        property: &str,
    ) -> Result<&'a PropertyInfo, AccessError> {
        schema
            .get(property)
            .ok_or_else(|| AccessError::UnknownProperty {
                type_name: schema.name.clone(),
                property: property.to_string(),
            })
    }

    fn instantiate_at(&self, type_name: &str, depth: usize) -> Result<Record, AccessError> {
        if depth > MAX_INSTANTIATION_DEPTH {
            return Err(AccessError::Instantiation {
                type_name: type_name.to_string(),
                message: format!(
                    "non-optional records nest deeper than {MAX_INSTANTIATION_DEPTH} levels"
                ),
            });
        }
        let schema = self.require(type_name).map_err(|e| AccessError::Instantiation {
            type_name: type_name.to_string(),
            message: e.to_string(),
        })?;

        let mut record = Record::new(type_name);
        for info in &schema.properties {
            let value = match (&info.default, &info.value_type) {
                (Some(default), _) => default.clone(),
                (None, ValueType::Record(nested)) => {
                    Value::Record(self.instantiate_at(nested, depth + 1)?)
                }
                (None, _) => Value::Null,
            };
            record.set(info.name.clone(), value);
        }
        Ok(record)
    }
}

fn check_instance(type_name: &str, instance: &Record) -> Result<(), AccessError> {
    if instance.type_name() != type_name {
        return Err(AccessError::WrongInstance {
            expected: type_name.to_string(),
            found: instance.type_name().to_string(),
        });
    }
    Ok(())
}

impl PropertyDirectory for SchemaRegistry {
    /// Non-optional record properties report the nested instance
    /// [`instantiate`](RecordAccessor::instantiate) fills them with.
    fn properties_of(&self, type_name: &str) -> Result<Vec<PropertyInfo>, AccessError> {
        let mut properties = self.require(type_name)?.properties.clone();
        for info in properties.iter_mut().filter(|p| p.default.is_none()) {
            if let ValueType::Record(nested) = &info.value_type
                && let Ok(instance) = self.instantiate(nested)
            {
                info.default = Some(Value::Record(instance));
            }
        }
        Ok(properties)
    }
}

impl RecordAccessor for SchemaRegistry {
    fn instantiate(&self, type_name: &str) -> Result<Record, AccessError> {
        self.instantiate_at(type_name, 0)
    }

    fn read(
        &self,
        type_name: &str,
        instance: &Record,
        property: &str,
    ) -> Result<Value, AccessError> {
        check_instance(type_name, instance)?;
        let schema = self.require(type_name)?;
        let info = self.require_property(schema, property)?;
        if !info.readable {
            return Err(AccessError::NotReadable {
                type_name: type_name.to_string(),
                property: property.to_string(),
            });
        }
        Ok(instance.get(property).cloned().unwrap_or_default())
    }

    fn write(
        &self,
        type_name: &str,
        instance: &mut Record,
        property: &str,
        value: Value,
    ) -> Result<(), AccessError> {
        check_instance(type_name, instance)?;
        let schema = self.require(type_name)?;
        let info = self.require_property(schema, property)?;
        if !info.writable {
            return Err(AccessError::NotWritable {
                type_name: type_name.to_string(),
                property: property.to_string(),
            });
        }
        if !info.value_type.accepts(&value) {
            return Err(AccessError::TypeMismatch {
                type_name: type_name.to_string(),
                property: property.to_string(),
                expected: info.value_type.to_string(),
                found: value.kind().to_string(),
            });
        }
        instance.set(property, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::CollectionKind;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new()
            .with(
                RecordSchema::new("Order")
                    .property("id", ValueType::Int)
                    .property("note", ValueType::String.optional())
                    .property("customer", ValueType::Record("Customer".into()))
                    .with(
                        PropertyInfo::new("tags", "collection<string>".parse().unwrap())
                            .with_default(CollectionKind::Set.empty()),
                    )
                    .with(PropertyInfo::new("total", ValueType::Float).read_only()),
            )
            .with(RecordSchema::new("Customer").property("name", ValueType::String))
    }

    #[test]
    fn test_instantiate_fills_defaults() {
        let order = registry().instantiate("Order").unwrap();
        assert_eq!(order.get("id"), Some(&Value::Int(0)));
        assert_eq!(order.get("note"), Some(&Value::Null));
        assert_eq!(order.get("tags"), Some(&CollectionKind::Set.empty()));
        let customer = order.get("customer").and_then(Value::as_record).unwrap();
        assert_eq!(customer.get("name"), Some(&Value::from("")));
    }

    #[test]
    fn test_properties_report_nested_instance_default() {
        let registry = registry();
        let properties = registry.properties_of("Order").unwrap();
        let customer = properties.iter().find(|p| p.name == "customer").unwrap();
        assert!(customer.is_defaulted());
        assert_eq!(
            customer.default.as_ref(),
            registry.instantiate("Order").unwrap().get("customer")
        );
    }

    #[test]
    fn test_instantiate_unknown_nested_type_fails() {
        let registry = SchemaRegistry::new()
            .with(RecordSchema::new("A").property("b", ValueType::Record("B".into())));
        let err = registry.instantiate("A").unwrap_err();
        assert!(matches!(err, AccessError::Instantiation { ref type_name, .. } if type_name == "B"));
    }

    #[test]
    fn test_instantiate_self_nesting_is_bounded() {
        let registry = SchemaRegistry::new()
            .with(RecordSchema::new("Node").property("next", ValueType::Record("Node".into())));
        assert!(matches!(
            registry.instantiate("Node"),
            Err(AccessError::Instantiation { .. })
        ));
    }

    #[test]
    fn test_read_unset_field_is_absent() {
        let order = Record::new("Order");
        let value = registry().read("Order", &order, "note").unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn test_write_rejects_wrong_type() {
        let registry = registry();
        let mut order = registry.instantiate("Order").unwrap();
        let err = registry
            .write("Order", &mut order, "id", Value::from("seven"))
            .unwrap_err();
        assert!(matches!(err, AccessError::TypeMismatch { .. }));
        let err = registry
            .write("Order", &mut order, "id", Value::Null)
            .unwrap_err();
        assert!(matches!(err, AccessError::TypeMismatch { .. }));
    }

    #[test]
    fn test_write_read_only_property_fails() {
        let registry = registry();
        let mut order = registry.instantiate("Order").unwrap();
        let err = registry
            .write("Order", &mut order, "total", Value::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, AccessError::NotWritable { .. }));
    }

    #[test]
    fn test_accessors_reject_foreign_instance() {
        let customer = Record::new("Customer");
        let err = registry().read("Order", &customer, "id").unwrap_err();
        assert!(matches!(err, AccessError::WrongInstance { .. }));
    }
}
