//! Host contracts
//!
//! The engine never inspects record types itself. A host supplies:
//!
//! - a [`PropertyDirectory`] listing each type's properties
//! - a [`RecordAccessor`] that instantiates records and reads/writes their properties
//!
//! Anything implementing both is a [`RecordHost`]. The bundled
//! [`SchemaRegistry`](crate::registry::SchemaRegistry) is one such host;
//! generated code or other schema sources can provide their own.

use crate::error::AccessError;
use crate::property::PropertyInfo;
use crate::value::{Record, Value};

/// Enumerates the properties of record types
pub trait PropertyDirectory: Send + Sync {
    /// Properties of `type_name`, in declaration order.
    ///
    /// `default` must be set whenever a fresh instance holds a deterministic
    /// value for the property; omitting a destination property depends on it.
    fn properties_of(&self, type_name: &str) -> Result<Vec<PropertyInfo>, AccessError>;
}

/// Creates records and reads/writes their properties
pub trait RecordAccessor: Send + Sync {
    /// New instance of `type_name` holding default values
    fn instantiate(&self, type_name: &str) -> Result<Record, AccessError>;

    /// Read `property` from `instance`
    fn read(&self, type_name: &str, instance: &Record, property: &str)
    -> Result<Value, AccessError>;

    /// Write `value` into `property` of `instance`
    fn write(
        &self,
        type_name: &str,
        instance: &mut Record,
        property: &str,
        value: Value,
    ) -> Result<(), AccessError>;
}

/// A complete host: directory plus accessors
pub trait RecordHost: PropertyDirectory + RecordAccessor {}

impl<T: PropertyDirectory + RecordAccessor> RecordHost for T {}
