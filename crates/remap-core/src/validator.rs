//! Completeness and ambiguity checks run when a spec is sealed
//!
//! Two passes over the property directories:
//!
//! 1. every writable destination property is the target of exactly one rule
//! 2. every readable source property is consumed or omitted by exactly one rule
//!
//! All violations are collected so a single failure lists everything the
//! author still has to fix.

use std::collections::HashMap;

use crate::error::{ValidationError, Violation};
use crate::property::{PropertyInfo, PropertyRef};
use crate::rule::TransformationRule;

/// Checks a finished rule set against both property directories
pub struct Validator<'a> {
    source_type: &'a str,
    destination_type: &'a str,
    source_properties: &'a [PropertyInfo],
    destination_properties: &'a [PropertyInfo],
    rules: &'a [TransformationRule],
}

impl<'a> Validator<'a> {
    /// Create a validator over one rule set
    pub fn new(
        source_type: &'a str,
        destination_type: &'a str,
        source_properties: &'a [PropertyInfo],
        destination_properties: &'a [PropertyInfo],
        rules: &'a [TransformationRule],
    ) -> Self {
        Self {
            source_type,
            destination_type,
            source_properties,
            destination_properties,
            rules,
        }
    }

    /// Run both passes
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = self.check_destinations();
        violations.extend(self.check_sources());

        if violations.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            source = self.source_type,
            destination = self.destination_type,
            count = violations.len(),
            "mapping rejected"
        );
        Err(ValidationError {
            source_type: self.source_type.to_string(),
            destination_type: self.destination_type.to_string(),
            violations,
        })
    }

    fn check_destinations(&self) -> Vec<Violation> {
        let claims = claims_by(self.rules, TransformationRule::destination);
        self.destination_properties
            .iter()
            .filter(|p| p.writable)
            .filter_map(|p| match claims.get(p.name.as_str()).map(Vec::as_slice) {
                None | Some([]) => Some(Violation::UnmappedDestination {
                    type_name: self.destination_type.to_string(),
                    property: p.name.clone(),
                }),
                Some([_]) => None,
                Some(rules) => Some(Violation::AmbiguousDestination {
                    type_name: self.destination_type.to_string(),
                    property: p.name.clone(),
                    rules: rules.iter().map(ToString::to_string).collect(),
                }),
            })
            .collect()
    }

    fn check_sources(&self) -> Vec<Violation> {
        let claims = claims_by(self.rules, TransformationRule::source);
        self.source_properties
            .iter()
            .filter(|p| p.readable)
            .filter_map(|p| match claims.get(p.name.as_str()).map(Vec::as_slice) {
                None | Some([]) => Some(Violation::UnmappedSource {
                    type_name: self.source_type.to_string(),
                    property: p.name.clone(),
                }),
                Some([_]) => None,
                Some(rules) => Some(Violation::AmbiguousSource {
                    type_name: self.source_type.to_string(),
                    property: p.name.clone(),
                    rules: rules.iter().map(ToString::to_string).collect(),
                }),
            })
            .collect()
    }
}

fn claims_by<'r>(
    rules: &'r [TransformationRule],
    side: impl Fn(&'r TransformationRule) -> Option<&'r PropertyRef>,
) -> HashMap<&'r str, Vec<&'r TransformationRule>> {
    let mut claims: HashMap<&str, Vec<&TransformationRule>> = HashMap::new();
    for rule in rules {
        if let Some(property) = side(rule) {
            claims.entry(property.name()).or_default().push(rule);
        }
    }
    claims
}
