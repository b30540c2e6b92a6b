//! Remap Contract Assertions
//!
//! Regression tests for mapping configurations. An [`AssertMapping`] lists
//! every rule a sealed [`Mapper`] is expected to declare; [`ensure`] fails
//! when a rule is missing, changed, or added.
//!
//! Rules added by implicit mapping are not part of the contract.
//!
//! # Example
//!
//! ```rust,ignore
//! use remap_assert::AssertMapping;
//!
//! AssertMapping::of(&mapper)
//!     .expect_reassign("name")
//!     .to("full_name")
//!     .expect_replace("age", "age_group")
//!     .and_test(|age| age)
//!     .expect_omit_in_source("secret")
//!     .ensure()?;
//! ```
//!
//! [`ensure`]: AssertMapping::ensure

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
mod expectation;

use std::sync::Arc;

use remap_core::{Mapper, RuleKind, TransformationRule, Value};

pub use error::AssertionFailure;
use expectation::{Expectation, Probe};

/// Expected rule set of one mapper
pub struct AssertMapping {
    mapper: Mapper,
    expectations: Vec<Expectation>,
    repeated: Option<String>,
}

impl AssertMapping {
    /// Start a contract for `mapper`
    pub fn of(mapper: &Mapper) -> Self {
        Self {
            mapper: mapper.clone(),
            expectations: Vec::new(),
            repeated: None,
        }
    }

    /// Expect `map(property)`
    pub fn expect_map(self, property: &str) -> Self {
        self.push(Expectation::new(RuleKind::Map, Some(property), Some(property)))
    }

    /// Expect `reassign(source).to(..)`; finish with [`ReassignExpectation::to`]
    pub fn expect_reassign(self, source: &str) -> ReassignExpectation {
        ReassignExpectation {
            assert: self,
            source: source.to_string(),
        }
    }

    /// Expect `replace(source, destination)`; finish with one of the
    /// [`ReplaceExpectation`] methods
    pub fn expect_replace(self, source: &str, destination: &str) -> ReplaceExpectation {
        ReplaceExpectation {
            assert: self,
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }

    /// Expect `omit_in_source(property)`
    pub fn expect_omit_in_source(self, property: &str) -> Self {
        self.push(Expectation::new(RuleKind::OmitSource, Some(property), None))
    }

    /// Expect `omit_in_destination(property)`
    pub fn expect_omit_in_destination(self, property: &str) -> Self {
        self.push(Expectation::new(RuleKind::OmitDestination, None, Some(property)))
    }

    /// Expect an explicit nested mapper between two record properties
    pub fn expect_use_mapper(self, source: &str, destination: &str) -> Self {
        self.push(Expectation::new(
            RuleKind::UseMapper,
            Some(source),
            Some(destination),
        ))
    }

    /// Expect an element-wise collection mapping
    pub fn expect_map_collection(self, source: &str, destination: &str) -> Self {
        self.push(Expectation::new(
            RuleKind::MapCollection,
            Some(source),
            Some(destination),
        ))
    }

    fn push(mut self, expectation: Expectation) -> Self {
        if self.repeated.is_none()
            && self
                .expectations
                .iter()
                .any(|existing| existing.same_operation(&expectation))
        {
            self.repeated = Some(expectation.describe(&self.mapper));
        }
        self.expectations.push(expectation);
        self
    }

    /// Check the mapper against every expectation.
    ///
    /// Fails on the first of: a repeated expectation, expectations with no
    /// matching rule, a probe that disagrees with the mapper's replace
    /// function, and declared rules no expectation accounts for.
    pub fn ensure(self) -> Result<(), AssertionFailure> {
        if let Some(expectation) = self.repeated {
            return Err(AssertionFailure::AlreadyDeclared { expectation });
        }

        let declared: Vec<&TransformationRule> = self.mapper.declared_rules().collect();
        let mut unmatched: Vec<Option<&TransformationRule>> =
            declared.iter().copied().map(Some).collect();
        let mut matched = Vec::with_capacity(self.expectations.len());
        let mut missing = Vec::new();

        for expectation in &self.expectations {
            let hit = unmatched
                .iter_mut()
                .find(|slot| slot.is_some_and(|rule| expectation.matches(rule)))
                .and_then(Option::take);
            match hit {
                Some(rule) => matched.push((expectation, rule)),
                None => missing.push(expectation.describe(&self.mapper)),
            }
        }

        if !missing.is_empty() {
            return Err(AssertionFailure::Missing {
                missing,
                actual: declared.iter().map(ToString::to_string).collect(),
            });
        }

        for (expectation, rule) in matched {
            if let Some(probe) = &expectation.probe {
                probe_replace(probe, rule)?;
            }
        }

        let unexpected: Vec<String> = unmatched
            .into_iter()
            .flatten()
            .map(ToString::to_string)
            .collect();
        if !unexpected.is_empty() {
            return Err(AssertionFailure::Unexpected { unexpected });
        }

        tracing::debug!(
            mapping = %self.mapper.type_pair(),
            expectations = self.expectations.len(),
            "mapping contract holds"
        );
        Ok(())
    }
}

/// Run the mapper's replace function and the probe on the same sample
fn probe_replace(probe: &Probe, rule: &TransformationRule) -> Result<(), AssertionFailure> {
    let TransformationRule::Replace { function, .. } = rule else {
        return Ok(());
    };
    let actual = function(probe.sample.clone()).map_err(|source| {
        AssertionFailure::UnexpectedException {
            rule: rule.to_string(),
            source,
        }
    })?;
    let expected = (probe.expected)(probe.sample.clone());
    if actual != expected {
        return Err(AssertionFailure::DifferentResult {
            rule: rule.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Pending `expect_reassign` awaiting its destination
#[must_use = "call `to` to name the destination property"]
pub struct ReassignExpectation {
    assert: AssertMapping,
    source: String,
}

impl ReassignExpectation {
    /// Name the destination property
    pub fn to(self, destination: &str) -> AssertMapping {
        self.assert.push(Expectation::new(
            RuleKind::Reassign,
            Some(&self.source),
            Some(destination),
        ))
    }
}

/// Pending `expect_replace` awaiting its sub-mode
#[must_use = "call `and_test`, `and_test_with` or `and_skip_when_null`"]
pub struct ReplaceExpectation {
    assert: AssertMapping,
    source: String,
    destination: String,
}

impl ReplaceExpectation {
    /// Expect a strict replace and compare it with `probe` on an absent value
    pub fn and_test<F>(self, probe: F) -> AssertMapping
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.and_test_with(Value::Null, probe)
    }

    /// Expect a strict replace and compare it with `probe` on `sample`
    pub fn and_test_with<F>(self, sample: impl Into<Value>, probe: F) -> AssertMapping
    where
        F: Fn(Value) -> Value + 'static,
    {
        let probe = Probe {
            sample: sample.into(),
            expected: Arc::new(probe),
        };
        self.finish(false, Some(probe))
    }

    /// Expect a replace that leaves the destination alone for absent values
    pub fn and_skip_when_null(self) -> AssertMapping {
        self.finish(true, None)
    }

    fn finish(self, skip_when_null: bool, probe: Option<Probe>) -> AssertMapping {
        let mut expectation = Expectation::new(
            RuleKind::Replace,
            Some(&self.source),
            Some(&self.destination),
        );
        expectation.skip_when_null = Some(skip_when_null);
        expectation.probe = probe;
        self.assert.push(expectation)
    }
}
