//! Declarative mapping projects
//!
//! A [`Project`] ties a [`Config`] to the host built from its declared types
//! and turns every `mappings/*.yaml` file into a sealed [`Mapper`]. Mappings
//! may refer to each other as nested mappers, so they are sealed in
//! dependency order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, MappingConfig, RuleConfig};
use crate::error::{Error, Result};
use crate::functions::FunctionRegistry;
use crate::host::RecordHost;
use crate::mapper::Mapper;
use crate::registry::SchemaRegistry;
use crate::spec::{MappingOptions, MappingSpec};

/// A loaded mapping project
#[derive(Debug, Clone)]
pub struct Project {
    config: Config,
    mappings: Vec<MappingConfig>,
    registry: Arc<SchemaRegistry>,
    /// Indices into `mappings`, dependencies first
    order: Vec<usize>,
}

impl Project {
    /// Load `remap.yaml` and every mapping file below `path`.
    ///
    /// Mapping names, nested mapper references and the dependency graph are
    /// checked here; rules themselves are only checked when sealing.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::load(path)?;
        let mappings = config.load_mappings()?;
        let registry = Arc::new(config.schema_registry()?);
        let order = seal_order(&mappings)?;

        tracing::debug!(
            project = %config.project.name,
            mappings = mappings.len(),
            "loaded project"
        );
        Ok(Self {
            config,
            mappings,
            registry,
            order,
        })
    }

    /// Project name
    pub fn name(&self) -> &str {
        &self.config.project.name
    }

    /// Underlying configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mapping definitions in file-name order
    pub fn mappings(&self) -> &[MappingConfig] {
        &self.mappings
    }

    /// Host built from the declared record types
    pub fn registry(&self) -> Arc<SchemaRegistry> {
        Arc::clone(&self.registry)
    }

    /// Seal every mapping, dependencies first
    pub fn seal_all(&self, functions: &FunctionRegistry) -> Result<BTreeMap<String, Mapper>> {
        self.seal_where(functions, |_| true)
    }

    /// Seal one mapping together with the mappings it depends on
    pub fn seal(&self, name: &str, functions: &FunctionRegistry) -> Result<Mapper> {
        let index = self.index_of(name).ok_or_else(|| Error::ConfigInvalid {
            message: format!("no mapping named '{name}'"),
        })?;

        let mut needed = HashSet::new();
        let mut pending = vec![index];
        while let Some(i) = pending.pop() {
            if needed.insert(i) {
                pending.extend(
                    self.mappings[i]
                        .dependencies()
                        .filter_map(|dep| self.index_of(dep)),
                );
            }
        }

        let mut sealed = self.seal_where(functions, |i| needed.contains(&i))?;
        sealed.remove(name).ok_or_else(|| Error::ConfigInvalid {
            message: format!("mapping '{name}' was not sealed"),
        })
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.mappings.iter().position(|m| m.name == name)
    }

    fn seal_where(
        &self,
        functions: &FunctionRegistry,
        include: impl Fn(usize) -> bool,
    ) -> Result<BTreeMap<String, Mapper>> {
        let mut sealed = BTreeMap::new();
        for &index in self.order.iter().filter(|&&i| include(i)) {
            let mapping = &self.mappings[index];
            let mapper =
                self.build(mapping, &sealed, functions)
                    .map_err(|source| Error::Mapping {
                        name: mapping.name.clone(),
                        source: Box::new(source),
                    })?;
            tracing::debug!(mapping = %mapping.name, rules = mapper.rules().len(), "sealed");
            sealed.insert(mapping.name.clone(), mapper);
        }
        Ok(sealed)
    }

    fn build(
        &self,
        mapping: &MappingConfig,
        sealed: &BTreeMap<String, Mapper>,
        functions: &FunctionRegistry,
    ) -> Result<Mapper> {
        let options = MappingOptions {
            implicit_mapping: mapping
                .implicit
                .unwrap_or(self.config.project.options.implicit_mapping),
        };
        let host: Arc<dyn RecordHost> = self.registry();
        let mut spec = MappingSpec::new(host, &mapping.from, &mapping.to)?.with_options(options);

        for used in &mapping.uses {
            spec = spec.use_mapper(nested(sealed, used)?)?;
        }

        for rule in &mapping.rules {
            spec = match rule {
                RuleConfig::Map { map } => spec.map(map)?,
                RuleConfig::Reassign { reassign } => {
                    spec.reassign(&reassign.from).to(&reassign.to)?
                }
                RuleConfig::Replace { replace } => {
                    let function =
                        functions
                            .get(&replace.function)
                            .ok_or_else(|| Error::ConfigInvalid {
                                message: format!("unknown function '{}'", replace.function),
                            })?;
                    spec.replace(&replace.from, &replace.to)
                        .with_function(function, replace.skip_when_null)?
                }
                RuleConfig::OmitInSource { omit_in_source } => spec.omit_in_source(omit_in_source)?,
                RuleConfig::OmitInDestination {
                    omit_in_destination,
                } => spec.omit_in_destination(omit_in_destination)?,
                RuleConfig::UseMapper { use_mapper: n } => {
                    spec.use_mapper_for(&n.from, &n.to, nested(sealed, &n.mapper)?)?
                }
                RuleConfig::MapCollection { map_collection: n } => {
                    spec.map_collection(&n.from, &n.to, nested(sealed, &n.mapper)?)?
                }
            };
        }

        Ok(spec.seal()?)
    }
}

fn nested<'a>(sealed: &'a BTreeMap<String, Mapper>, name: &str) -> Result<&'a Mapper> {
    sealed.get(name).ok_or_else(|| Error::ConfigInvalid {
        message: format!("nested mapping '{name}' is not available"),
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first topological order over the `uses`/`mapper` references
fn seal_order(mappings: &[MappingConfig]) -> Result<Vec<usize>> {
    let mut by_name = HashMap::with_capacity(mappings.len());
    for (index, mapping) in mappings.iter().enumerate() {
        if by_name.insert(mapping.name.as_str(), index).is_some() {
            return Err(Error::ConfigInvalid {
                message: format!("mapping '{}' is defined more than once", mapping.name),
            });
        }
    }

    let mut edges = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let mut targets = Vec::new();
        for dep in mapping.dependencies() {
            let target = by_name.get(dep).copied().ok_or_else(|| Error::ConfigInvalid {
                message: format!("mapping '{}' refers to unknown mapping '{dep}'", mapping.name),
            })?;
            targets.push(target);
        }
        edges.push(targets);
    }

    fn visit(
        index: usize,
        edges: &[Vec<usize>],
        marks: &mut [Option<Mark>],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> std::result::Result<(), Vec<usize>> {
        match marks[index] {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|&i| i == index).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(index);
                return Err(cycle);
            }
            None => {}
        }
        marks[index] = Some(Mark::Visiting);
        path.push(index);
        for &next in &edges[index] {
            visit(next, edges, marks, path, order)?;
        }
        path.pop();
        marks[index] = Some(Mark::Done);
        order.push(index);
        Ok(())
    }

    let mut marks = vec![None; mappings.len()];
    let mut order = Vec::with_capacity(mappings.len());
    for index in 0..mappings.len() {
        visit(index, &edges, &mut marks, &mut Vec::new(), &mut order).map_err(|cycle| {
            let names: Vec<_> = cycle.iter().map(|&i| mappings[i].name.as_str()).collect();
            Error::ConfigInvalid {
                message: format!("mappings depend on each other: {}", names.join(" -> ")),
            }
        })?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Record, Value};

    const PROJECT: &str = r#"
name: people
types:
  Person:
    name: string
    age: int
    home: Address
  Address:
    city: string
  PersonView:
    full_name: string
    age: string
    home: AddressView
  AddressView:
    city: string
"#;

    fn project(mappings: &[(&str, &str)]) -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("remap.yaml"), PROJECT).unwrap();
        std::fs::create_dir(dir.path().join("mappings")).unwrap();
        for (file, contents) in mappings {
            std::fs::write(dir.path().join("mappings").join(file), contents).unwrap();
        }
        let project = Project::load(dir.path()).unwrap();
        (dir, project)
    }

    const ADDRESS: &str = "name: address_view\nfrom: Address\nto: AddressView\n";
    const PERSON: &str = r#"
name: person_view
from: Person
to: PersonView
uses: [address_view]
rules:
  - reassign: { from: name, to: full_name }
  - replace: { from: age, to: age, function: to_string }
"#;

    #[test]
    fn test_seal_all_orders_dependencies() {
        // person sorts first by file name but needs address sealed before it
        let (_dir, project) = project(&[("a_person.yaml", PERSON), ("b_address.yaml", ADDRESS)]);
        let mappers = project.seal_all(&FunctionRegistry::with_builtins()).unwrap();
        assert_eq!(mappers.len(), 2);

        let person = Record::new("Person")
            .with("name", "Ada")
            .with("age", 36)
            .with("home", Record::new("Address").with("city", "London"));
        let view = mappers["person_view"].transform(&person).unwrap();
        assert_eq!(view.get("full_name"), Some(&Value::from("Ada")));
        assert_eq!(view.get("age"), Some(&Value::from("36")));
        assert_eq!(
            view.get("home"),
            Some(&Value::Record(
                Record::new("AddressView").with("city", "London")
            ))
        );
    }

    #[test]
    fn test_seal_single_mapping() {
        let (_dir, project) = project(&[("a.yaml", ADDRESS), ("p.yaml", PERSON)]);
        let mapper = project
            .seal("person_view", &FunctionRegistry::with_builtins())
            .unwrap();
        assert_eq!(mapper.type_pair(), "Person -> PersonView");
        assert!(project.seal("nope", &FunctionRegistry::new()).is_err());
    }

    #[test]
    fn test_unknown_function_names_the_mapping() {
        let (_dir, project) = project(&[("a.yaml", ADDRESS), ("p.yaml", PERSON)]);
        let err = project.seal_all(&FunctionRegistry::new()).unwrap_err();
        match err {
            Error::Mapping { name, source } => {
                assert_eq!(name, "person_view");
                assert!(source.to_string().contains("to_string"));
            }
            other => panic!("Expected mapping error, got {other:?}"),
        }
    }

    #[test]
    fn test_incomplete_mapping_fails_validation() {
        let incomplete = "name: partial\nfrom: Person\nto: PersonView\nimplicit: false\n";
        let (_dir, project) = project(&[("x.yaml", incomplete)]);
        let err = project.seal_all(&FunctionRegistry::new()).unwrap_err();
        let Error::Mapping { source, .. } = err else {
            panic!("Expected mapping error");
        };
        assert!(matches!(*source, Error::Validation(_)));
    }

    #[test]
    fn test_cycle_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("remap.yaml"), PROJECT).unwrap();
        std::fs::create_dir(dir.path().join("mappings")).unwrap();
        std::fs::write(
            dir.path().join("mappings/a.yaml"),
            "name: a\nfrom: Address\nto: AddressView\nuses: [b]\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("mappings/b.yaml"),
            "name: b\nfrom: Address\nto: AddressView\nuses: [a]\n",
        )
        .unwrap();
        let err = Project::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("a -> b -> a"), "{err}");
    }

    #[test]
    fn test_unknown_and_duplicate_references() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("remap.yaml"), PROJECT).unwrap();
        std::fs::create_dir(dir.path().join("mappings")).unwrap();
        std::fs::write(
            dir.path().join("mappings/a.yaml"),
            "name: a\nfrom: Address\nto: AddressView\nuses: [ghost]\n",
        )
        .unwrap();
        let err = Project::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("ghost"));

        std::fs::write(dir.path().join("mappings/a.yaml"), ADDRESS).unwrap();
        std::fs::write(dir.path().join("mappings/b.yaml"), ADDRESS).unwrap();
        let err = Project::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
