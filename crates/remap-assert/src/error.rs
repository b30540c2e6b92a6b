//! Assertion failures

use remap_core::Value;
use remap_core::error::BoxError;
use thiserror::Error;

/// Message of [`AssertionFailure::AlreadyDeclared`]
pub const TRANSFORMATION_ALREADY_ADDED: &str =
    "The specified transformation was already added as an expectation.";

/// Leading line of [`AssertionFailure::Missing`]
pub const EXPECTED_TRANSFORMATION: &str =
    "The following expected transformations are not present in the mapping:";

/// Leading line of [`AssertionFailure::Unexpected`]
pub const UNEXPECTED_TRANSFORMATION: &str =
    "The following unexpected transformations were declared on the mapping:";

/// Prefix of [`AssertionFailure::UnexpectedException`]
pub const UNEXPECTED_EXCEPTION: &str =
    "Function threw an unexpected exception for transformation: ";

/// Prefix of [`AssertionFailure::DifferentResult`]
pub const DIFFERENT_RESULT: &str =
    "The replace transformation of the mapping has a different result than expected: ";

/// A mapper does not match its declared contract
#[derive(Error, Debug)]
pub enum AssertionFailure {
    /// The same expectation was declared twice
    #[error("{}", TRANSFORMATION_ALREADY_ADDED)]
    AlreadyDeclared {
        /// The repeated expectation
        expectation: String,
    },

    /// Expectations without a matching rule
    #[error(
        "{}\n{}\nActual transformations:\n{}",
        EXPECTED_TRANSFORMATION,
        bullets(.missing),
        bullets(.actual)
    )]
    Missing {
        /// Expectations that matched nothing
        missing: Vec<String>,
        /// Rules the mapper declares
        actual: Vec<String>,
    },

    /// Rules no expectation accounted for
    #[error("{}\n{}", UNEXPECTED_TRANSFORMATION, bullets(.unexpected))]
    Unexpected {
        /// The unmatched rules
        unexpected: Vec<String>,
    },

    /// The mapper's replace function failed while being probed
    #[error("{}{rule}", UNEXPECTED_EXCEPTION)]
    UnexpectedException {
        /// The probed rule
        rule: String,
        /// Error returned by the function
        #[source]
        source: BoxError,
    },

    /// Probe and replace function disagree
    #[error("{}{rule}\nExpected: {expected}\nActual: {actual}", DIFFERENT_RESULT)]
    DifferentResult {
        /// The probed rule
        rule: String,
        /// Output of the probe
        expected: Value,
        /// Output of the mapper's function
        actual: Value,
    },
}

fn bullets(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
