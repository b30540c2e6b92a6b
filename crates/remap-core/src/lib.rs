//! Remap Core Library
//!
//! This crate provides verified, declarative mappings between two record types:
//! - Property model and host contracts (directory, accessors)
//! - Transformation rules and the mapping spec builder
//! - Completeness/ambiguity validation at seal time
//! - Mapper execution, including nested records and collections
//! - YAML project configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ MappingSpec │────▶│  Validator  │────▶│   Mapper    │
//! │  (builder)  │     │   (seal)    │     │ (transform) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                                       │
//!        └───────── PropertyDirectory ───────────┘
//!                   + RecordAccessor
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use remap_core::{FunctionRegistry, Project};
//!
//! let project = Project::load("./mappings-project")?;
//! let mappers = project.seal_all(&FunctionRegistry::with_builtins())?;
//! let view = mappers["person_view"].transform(&person)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod functions;
pub mod host;
pub mod mapper;
pub mod project;
pub mod property;
pub mod registry;
pub mod rule;
pub mod spec;
pub mod validator;
pub mod value;

pub use config::{Config, ProjectConfig};
pub use error::{
    AccessError, Error, ExecutionError, Result, SpecificationError, ValidationError, Violation,
};
pub use functions::FunctionRegistry;
pub use host::{PropertyDirectory, RecordAccessor, RecordHost};
pub use mapper::Mapper;
pub use project::Project;
pub use rule::{RuleKind, TransformationRule};
pub use spec::{MappingOptions, MappingSpec};
pub use value::{Record, Value, ValueSet};
