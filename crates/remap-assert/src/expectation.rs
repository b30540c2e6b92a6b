//! Expected rules

use std::sync::Arc;

use remap_core::{Mapper, RuleKind, TransformationRule, Value};

/// Sample value and reference function for checking a replace rule
pub(crate) struct Probe {
    pub(crate) sample: Value,
    pub(crate) expected: Arc<dyn Fn(Value) -> Value>,
}

/// One rule the mapper must declare
pub(crate) struct Expectation {
    kind: RuleKind,
    source: Option<String>,
    destination: Option<String>,
    pub(crate) skip_when_null: Option<bool>,
    pub(crate) probe: Option<Probe>,
}

impl Expectation {
    pub(crate) fn new(kind: RuleKind, source: Option<&str>, destination: Option<&str>) -> Self {
        Self {
            kind,
            source: source.map(str::to_string),
            destination: destination.map(str::to_string),
            skip_when_null: None,
            probe: None,
        }
    }

    /// Same kind and properties; the replace sub-mode does not count
    pub(crate) fn same_operation(&self, other: &Expectation) -> bool {
        self.kind == other.kind
            && self.source == other.source
            && self.destination == other.destination
    }

    pub(crate) fn matches(&self, rule: &TransformationRule) -> bool {
        self.kind == rule.kind()
            && self.source.as_deref() == rule.source().map(|p| p.name())
            && self.destination.as_deref() == rule.destination().map(|p| p.name())
            && self.skip_when_null == rule.skip_when_null()
    }

    /// Render in the same words the rule itself uses
    pub(crate) fn describe(&self, mapper: &Mapper) -> String {
        let source = self
            .source
            .as_deref()
            .map(|name| format!("Property '{name}' in {}", mapper.source_type()))
            .unwrap_or_default();
        let destination = self
            .destination
            .as_deref()
            .map(|name| format!("Property '{name}' in {}", mapper.destination_type()))
            .unwrap_or_default();

        match self.kind {
            RuleKind::Map => format!("Map {source} to {destination}"),
            RuleKind::Replace if self.skip_when_null == Some(true) => {
                format!("Replace (skipping when null) {source} with {destination} using transformation")
            }
            RuleKind::Replace => {
                format!("Replace {source} with {destination} using transformation")
            }
            RuleKind::Reassign => format!("Reassign {source} to {destination}"),
            RuleKind::OmitSource => format!("Omit in source {source}"),
            RuleKind::OmitDestination => format!("Omit in destination {destination}"),
            RuleKind::UseMapper => format!("Map {source} to {destination} using mapper"),
            RuleKind::MapCollection => {
                format!("Map collection {source} to {destination} using mapper")
            }
        }
    }
}
