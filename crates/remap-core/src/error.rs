//! Error types for remap-core
//!
//! Every phase of a mapping's life has its own error type:
//!
//! - [`SpecificationError`] while rules are declared on a [`MappingSpec`](crate::MappingSpec)
//! - [`ValidationError`] when the spec is sealed
//! - [`ExecutionError`] when a [`Mapper`](crate::Mapper) transforms a record
//!
//! [`Error`] aggregates them together with configuration failures.

use std::fmt;

use thiserror::Error;

use crate::property::PropertyRef;

/// Result type alias for remap-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by caller-supplied replace functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in remap-core
#[derive(Error, Debug)]
pub enum Error {
    /// A rule declaration was rejected
    #[error(transparent)]
    Specification(#[from] SpecificationError),

    /// A spec could not be sealed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A transformation failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A host accessor failed outside of a transformation
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A configured mapping could not be built
    #[error("mapping '{name}': {source}")]
    Mapping {
        /// Mapping name
        name: String,
        /// What went wrong
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a record host's directory or accessors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    /// The host does not know the record type
    #[error("unknown record type '{type_name}'")]
    UnknownType {
        /// Requested type
        type_name: String,
    },

    /// The record type has no such property
    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty {
        /// Owning type
        type_name: String,
        /// Requested property
        property: String,
    },

    /// The property has no read accessor
    #[error("property '{property}' in '{type_name}' is not readable")]
    NotReadable {
        /// Owning type
        type_name: String,
        /// Property name
        property: String,
    },

    /// The property has no write accessor
    #[error("property '{property}' in '{type_name}' is not writable")]
    NotWritable {
        /// Owning type
        type_name: String,
        /// Property name
        property: String,
    },

    /// The write accessor rejected the value
    #[error("property '{property}' in '{type_name}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Owning type
        type_name: String,
        /// Property name
        property: String,
        /// Declared type
        expected: String,
        /// Kind of the rejected value
        found: String,
    },

    /// The instance passed to an accessor belongs to another type
    #[error("expected an instance of '{expected}', got '{found}'")]
    WrongInstance {
        /// Type the accessor was asked about
        expected: String,
        /// Type of the instance
        found: String,
    },

    /// A new instance could not be created
    #[error("cannot instantiate '{type_name}': {message}")]
    Instantiation {
        /// Type that failed
        type_name: String,
        /// Description of the failure
        message: String,
    },
}

/// Errors raised while rules are declared on a mapping spec
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecificationError {
    /// The property directory does not know the type
    #[error("unknown record type '{type_name}'")]
    UnknownType {
        /// Requested type
        type_name: String,
    },

    /// The property directory failed for another reason
    #[error("cannot list properties of '{type_name}'")]
    Directory {
        /// Requested type
        type_name: String,
        /// Host failure
        #[source]
        source: AccessError,
    },

    /// The property does not exist on its type
    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty {
        /// Owning type
        type_name: String,
        /// Requested property
        property: String,
    },

    /// The source property cannot be read
    #[error("source property '{property}' in '{type_name}' is not readable")]
    NotReadable {
        /// Owning type
        type_name: String,
        /// Property name
        property: String,
    },

    /// The destination property cannot be written
    #[error("destination property '{property}' in '{type_name}' is not writable")]
    NotWritable {
        /// Owning type
        type_name: String,
        /// Property name
        property: String,
    },

    /// Map or reassign between incompatible value types
    #[error("cannot copy {from} ({from_type}) to {to} ({to_type})")]
    IncompatibleTypes {
        /// Source property
        from: PropertyRef,
        /// Declared source type
        from_type: String,
        /// Destination property
        to: PropertyRef,
        /// Declared destination type
        to_type: String,
    },

    /// A source property was already claimed by another rule
    #[error("{property} is already the source of: {existing}")]
    DuplicateSource {
        /// The claimed property
        property: PropertyRef,
        /// Rule that claimed it first
        existing: String,
    },

    /// A destination property was already claimed by another rule
    #[error("{property} is already the destination of: {existing}")]
    DuplicateDestination {
        /// The claimed property
        property: PropertyRef,
        /// Rule that claimed it first
        existing: String,
    },

    /// A destination omitted from the mapping has no value to fall back on
    #[error("{property} cannot be omitted: it is neither optional nor defaulted")]
    NoDefault {
        /// The omitted property
        property: PropertyRef,
    },

    /// A nested mapping was requested on a non-record property
    #[error("{property} is not record-typed (declared {declared})")]
    NotARecord {
        /// The property
        property: PropertyRef,
        /// Declared type
        declared: String,
    },

    /// A collection mapping was requested on a non-collection property
    #[error("{property} is not collection-typed (declared {declared})")]
    NotACollection {
        /// The property
        property: PropertyRef,
        /// Declared type
        declared: String,
    },

    /// The declared collection kind cannot be rebuilt
    #[error("{property} declares unsupported collection kind {declared}")]
    UnsupportedCollection {
        /// The property
        property: PropertyRef,
        /// Declared type
        declared: String,
    },

    /// A nested mapper does not translate the required type pair
    #[error("mapper {found} cannot map {required}")]
    MapperMismatch {
        /// Required `source -> destination` pair
        required: String,
        /// Pair the mapper translates
        found: String,
    },

    /// Two nested mappers were registered for the same type pair
    #[error("a mapper for {pair} is already registered")]
    DuplicateMapper {
        /// The `source -> destination` pair
        pair: String,
    },
}

/// A single completeness or ambiguity problem found while sealing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// No rule writes this destination property
    UnmappedDestination {
        /// Destination type
        type_name: String,
        /// Property name
        property: String,
    },

    /// No rule consumes or omits this source property
    UnmappedSource {
        /// Source type
        type_name: String,
        /// Property name
        property: String,
    },

    /// More than one rule writes this destination property
    AmbiguousDestination {
        /// Destination type
        type_name: String,
        /// Property name
        property: String,
        /// Descriptions of the conflicting rules
        rules: Vec<String>,
    },

    /// More than one rule consumes this source property
    AmbiguousSource {
        /// Source type
        type_name: String,
        /// Property name
        property: String,
        /// Descriptions of the conflicting rules
        rules: Vec<String>,
    },
}

impl Violation {
    /// Name of the unresolved property
    pub fn property(&self) -> &str {
        match self {
            Self::UnmappedDestination { property, .. }
            | Self::UnmappedSource { property, .. }
            | Self::AmbiguousDestination { property, .. }
            | Self::AmbiguousSource { property, .. } => property,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedDestination {
                type_name,
                property,
            } => write!(
                f,
                "destination property '{property}' in {type_name} is not mapped; \
                 map it or omit it in the destination"
            ),
            Self::UnmappedSource {
                type_name,
                property,
            } => write!(
                f,
                "source property '{property}' in {type_name} is not mapped; \
                 map it or omit it in the source"
            ),
            Self::AmbiguousDestination {
                type_name,
                property,
                rules,
            } => write!(
                f,
                "destination property '{property}' in {type_name} is written by {} rules: {}",
                rules.len(),
                rules.join("; ")
            ),
            Self::AmbiguousSource {
                type_name,
                property,
                rules,
            } => write!(
                f,
                "source property '{property}' in {type_name} is consumed by {} rules: {}",
                rules.len(),
                rules.join("; ")
            ),
        }
    }
}

/// A mapping spec failed completeness or ambiguity checks
#[derive(Error, Debug, Clone, PartialEq)]
#[error("mapping from {source_type} to {destination_type} is invalid:\n{}", render_violations(.violations))]
pub struct ValidationError {
    /// Source type of the rejected spec
    pub source_type: String,
    /// Destination type of the rejected spec
    pub destination_type: String,
    /// Every problem found, in property order
    pub violations: Vec<Violation>,
}

fn render_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors that can occur while a mapper transforms a record
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The mapper was given a record of another type
    #[error("mapper expects a '{expected}' record, got '{found}'")]
    SourceTypeMismatch {
        /// Source type of the mapper
        expected: String,
        /// Type of the supplied record
        found: String,
    },

    /// The destination record could not be created
    #[error("failed to instantiate destination: {0}")]
    Instantiation(#[source] AccessError),

    /// A source property could not be read
    #[error("failed to read {property}: {source}")]
    Read {
        /// Property that failed
        property: PropertyRef,
        /// Accessor failure
        #[source]
        source: AccessError,
    },

    /// A destination property rejected its value
    #[error("failed to write {property}: {source}")]
    Write {
        /// Property that failed
        property: PropertyRef,
        /// Accessor failure
        #[source]
        source: AccessError,
    },

    /// A caller-supplied replace function failed
    #[error("replace function failed: {rule}")]
    Replace {
        /// Description of the failing rule
        rule: String,
        /// Error returned by the function
        #[source]
        source: BoxError,
    },

    /// A value had an unexpected shape for its rule
    #[error("{property} holds {found}, expected {expected}")]
    UnexpectedValue {
        /// Property that was read
        property: PropertyRef,
        /// What the rule needed
        expected: String,
        /// What was found
        found: String,
    },

    /// A collection instance could not be classified as list or set
    #[error("{property} holds unsupported collection instance {found}")]
    UnsupportedCollection {
        /// Destination property
        property: PropertyRef,
        /// Kind of the instance found
        found: String,
    },

    /// A nested mapper failed
    #[error("nested mapping of {property} failed: {source}")]
    Nested {
        /// Property being mapped
        property: PropertyRef,
        /// Failure inside the nested mapper
        #[source]
        source: Box<ExecutionError>,
    },
}
