//! Configuration parsing and validation
//!
//! This module handles loading Remap project files.
//!
//! # Configuration Files
//!
//! - `remap.yaml` - Project root configuration and record type schemas
//! - `mappings/*.yaml` - One mapping spec per file

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::property::{CollectionKind, PropertyInfo, ValueType};
use crate::registry::{RecordSchema, SchemaRegistry};
use crate::spec::MappingOptions;

/// Name of the project root file
pub const PROJECT_FILE: &str = "remap.yaml";

/// Directory holding mapping definitions, relative to the project root
pub const MAPPINGS_DIR: &str = "mappings";

/// Root project configuration from `remap.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Defaults applied to every mapping
    #[serde(default)]
    pub options: MappingOptions,

    /// Record type schemas by type name
    #[serde(default)]
    pub types: BTreeMap<String, TypeConfig>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Properties of one record type, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeConfig {
    /// Property name and declaration pairs
    #[serde(
        serialize_with = "serialize_ordered",
        deserialize_with = "deserialize_ordered"
    )]
    pub properties: Vec<(String, PropertyConfig)>,
}

/// A property declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyConfig {
    /// Just the type: `name: string`
    Simple(ValueType),

    /// Type plus accessor and instance settings
    Detailed {
        /// Declared value type
        #[serde(rename = "type")]
        value_type: ValueType,
        /// Whether the property can be read
        #[serde(default = "default_true")]
        readable: bool,
        /// Whether the property can be written
        #[serde(default = "default_true")]
        writable: bool,
        /// Concrete kind a fresh instance holds for `collection<T>`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        instance: Option<CollectionKind>,
    },
}

fn default_true() -> bool {
    true
}

impl PropertyConfig {
    /// Resolve into the property directory entry for `owner`
    pub fn to_info(&self, owner: &str, name: &str) -> Result<PropertyInfo> {
        let (value_type, readable, writable, instance) = match self {
            Self::Simple(value_type) => (value_type, true, true, None),
            Self::Detailed {
                value_type,
                readable,
                writable,
                instance,
            } => (value_type, *readable, *writable, *instance),
        };

        let mut info = PropertyInfo::new(name, value_type.clone());
        info.readable = readable;
        info.writable = writable;

        match (value_type.base(), instance) {
            (ValueType::Collection(_), Some(kind)) if !value_type.is_optional() => {
                info = info.with_default(kind.empty());
            }
            (ValueType::Collection(_), None) if !value_type.is_optional() => {
                return Err(Error::ConfigInvalid {
                    message: format!(
                        "property '{name}' in {owner} is a {value_type} and needs an `instance` kind"
                    ),
                });
            }
            (ValueType::Collection(_), _) | (_, None) => {}
            (_, Some(_)) => {
                return Err(Error::ConfigInvalid {
                    message: format!(
                        "property '{name}' in {owner} sets `instance` but is a {value_type}"
                    ),
                });
            }
        }
        Ok(info)
    }
}

fn serialize_ordered<S: Serializer>(
    properties: &[(String, PropertyConfig)],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_map(properties.iter().map(|(name, config)| (name, config)))
}

fn deserialize_ordered<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<(String, PropertyConfig)>, D::Error> {
    struct Ordered;

    impl<'de> Visitor<'de> for Ordered {
        type Value = Vec<(String, PropertyConfig)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of property names to declarations")
        }

        fn visit_map<A: MapAccess<'de>>(
            self,
            mut map: A,
        ) -> std::result::Result<Self::Value, A::Error> {
            let mut properties = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, PropertyConfig>()? {
                if properties.iter().any(|(name, _)| *name == entry.0) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate property '{}'",
                        entry.0
                    )));
                }
                properties.push(entry);
            }
            Ok(properties)
        }
    }

    deserializer.deserialize_map(Ordered)
}

/// A mapping definition from `mappings/*.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Mapping name (must be unique within project)
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Source record type
    pub from: String,

    /// Destination record type
    pub to: String,

    /// Override of the project's implicit mapping default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit: Option<bool>,

    /// Mappings registered for implicit nested use
    #[serde(default)]
    pub uses: Vec<String>,

    /// Declared rules, in order
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl MappingConfig {
    /// Names of every other mapping this one needs sealed first
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.uses
            .iter()
            .map(String::as_str)
            .chain(self.rules.iter().filter_map(RuleConfig::mapper))
    }
}

/// Source and destination property names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairConfig {
    /// Source property
    pub from: String,
    /// Destination property
    pub to: String,
}

/// Replace rule body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceConfig {
    /// Source property
    pub from: String,
    /// Destination property
    pub to: String,
    /// Name of a registered function
    pub function: String,
    /// Leave the destination untouched when the source is absent
    #[serde(default)]
    pub skip_when_null: bool,
}

/// Nested mapper rule body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedConfig {
    /// Source property
    pub from: String,
    /// Destination property
    pub to: String,
    /// Name of the mapping applied to the property value
    pub mapper: String,
}

/// Rule configuration from YAML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleConfig {
    /// Same-name copy
    Map {
        /// Property name
        map: String,
    },

    /// Copy under a different name
    Reassign {
        /// Property pair
        reassign: PairConfig,
    },

    /// Computed value
    Replace {
        /// Replace body
        replace: ReplaceConfig,
    },

    /// Deliberately unread source property
    OmitInSource {
        /// Property name
        omit_in_source: String,
    },

    /// Deliberately unwritten destination property
    OmitInDestination {
        /// Property name
        omit_in_destination: String,
    },

    /// Embedded record through a nested mapper
    UseMapper {
        /// Nested body
        use_mapper: NestedConfig,
    },

    /// Collection of records through a nested mapper
    MapCollection {
        /// Nested body
        map_collection: NestedConfig,
    },
}

impl RuleConfig {
    /// Name of the nested mapping this rule refers to
    pub fn mapper(&self) -> Option<&str> {
        match self {
            Self::UseMapper { use_mapper: nested }
            | Self::MapCollection {
                map_collection: nested,
            } => Some(&nested.mapper),
            _ => None,
        }
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or remap.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(PROJECT_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        tracing::debug!(
            path = %config_path.display(),
            types = project.types.len(),
            "loaded project configuration"
        );

        Ok(Self { project, base_path })
    }

    /// Load all mapping definitions from `mappings/*.yaml`, in file-name order
    pub fn load_mappings(&self) -> Result<Vec<MappingConfig>> {
        let mappings_dir = self.base_path.join(MAPPINGS_DIR);
        if !mappings_dir.exists() {
            return Ok(vec![]);
        }

        let mut entries: Vec<_> = std::fs::read_dir(&mappings_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        entries.sort_by_key(|e| e.path());

        let mut mappings = Vec::with_capacity(entries.len());
        for entry in entries {
            let contents = std::fs::read_to_string(entry.path())?;
            let mapping: MappingConfig =
                serde_yaml::from_str(&contents).map_err(|e| Error::ConfigInvalid {
                    message: format!("{}: {e}", entry.path().display()),
                })?;
            mappings.push(mapping);
        }
        Ok(mappings)
    }

    /// Build the reference host from the declared record types
    pub fn schema_registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new();
        for (type_name, config) in &self.project.types {
            let mut schema = RecordSchema::new(type_name.clone());
            for (name, property) in &config.properties {
                schema = schema.with(property.to_info(type_name, name)?);
            }
            registry.register(schema);
        }

        // Record references must resolve within the project
        for (type_name, config) in &self.project.types {
            for (name, property) in &config.properties {
                let value_type = match property {
                    PropertyConfig::Simple(t) | PropertyConfig::Detailed { value_type: t, .. } => t,
                };
                if let Some(referenced) = referenced_record(value_type)
                    && registry.schema(referenced).is_none()
                {
                    return Err(Error::ConfigInvalid {
                        message: format!(
                            "property '{name}' in {type_name} refers to unknown type '{referenced}'"
                        ),
                    });
                }
            }
        }
        Ok(registry)
    }
}

fn referenced_record(value_type: &ValueType) -> Option<&str> {
    match value_type.base() {
        ValueType::Record(name) => Some(name),
        ValueType::List(element)
        | ValueType::Set(element)
        | ValueType::Collection(element)
        | ValueType::Map(element) => referenced_record(element),
        _ => None,
    }
}
