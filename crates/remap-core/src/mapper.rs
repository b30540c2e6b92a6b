//! Sealed, executable mappings
//!
//! A [`Mapper`] is produced by [`MappingSpec::seal`](crate::MappingSpec::seal)
//! and is the only artifact a caller keeps. It is immutable and cheap to
//! clone; clones share the same rule set and can transform records from
//! many threads at once.

use std::fmt;
use std::sync::Arc;

use crate::error::ExecutionError;
use crate::host::RecordHost;
use crate::rule::TransformationRule;
use crate::value::Record;

/// Validated transformation from one record type to another
#[derive(Clone)]
pub struct Mapper {
    inner: Arc<MapperInner>,
}

struct MapperInner {
    source_type: String,
    destination_type: String,
    rules: Vec<TransformationRule>,
    host: Arc<dyn RecordHost>,
}

impl Mapper {
    pub(crate) fn new(
        source_type: String,
        destination_type: String,
        rules: Vec<TransformationRule>,
        host: Arc<dyn RecordHost>,
    ) -> Self {
        Self {
            inner: Arc::new(MapperInner {
                source_type,
                destination_type,
                rules,
                host,
            }),
        }
    }

    /// Type of the records this mapper reads
    pub fn source_type(&self) -> &str {
        &self.inner.source_type
    }

    /// Type of the records this mapper produces
    pub fn destination_type(&self) -> &str {
        &self.inner.destination_type
    }

    /// `Source -> Destination`
    pub fn type_pair(&self) -> String {
        format!("{} -> {}", self.source_type(), self.destination_type())
    }

    /// Sealed rules in declaration order, implicit rules last
    pub fn rules(&self) -> &[TransformationRule] {
        &self.inner.rules
    }

    /// Rules that were declared rather than added by implicit mapping
    pub fn declared_rules(&self) -> impl Iterator<Item = &TransformationRule> {
        self.rules().iter().filter(|rule| !rule.is_implicit())
    }

    /// Map `source` onto a freshly instantiated destination record
    pub fn transform(&self, source: &Record) -> Result<Record, ExecutionError> {
        if source.type_name() != self.source_type() {
            return Err(ExecutionError::SourceTypeMismatch {
                expected: self.source_type().to_string(),
                found: source.type_name().to_string(),
            });
        }

        let host = self.inner.host.as_ref();
        let mut destination = host
            .instantiate(self.destination_type())
            .map_err(ExecutionError::Instantiation)?;

        for rule in self.rules().iter().filter(|rule| rule.is_executable()) {
            tracing::trace!(rule = %rule, "applying rule");
            rule.apply(host, source, &mut destination)?;
        }
        Ok(destination)
    }

    /// Map every record of `sources`, stopping at the first failure
    pub fn transform_all<'a>(
        &self,
        sources: impl IntoIterator<Item = &'a Record>,
    ) -> Result<Vec<Record>, ExecutionError> {
        sources
            .into_iter()
            .map(|source| self.transform(source))
            .collect()
    }
}

impl fmt::Display for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Mapping from {} to {} with transformations:",
            self.source_type(),
            self.destination_type()
        )?;
        for rule in self.rules() {
            writeln!(f, "- {rule}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("source_type", &self.inner.source_type)
            .field("destination_type", &self.inner.destination_type)
            .field("rules", &self.inner.rules)
            .finish()
    }
}
