// Per-probe expectations
//
// Kept outside the metadata block so the block schema stays fixed. A probe
// without an expectation is informational: any divergence is documented.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{PathShape, PathValue, ProbeId};
use crate::error::{AppError, Result};
use crate::port::ProbeOutput;

/// Expected observation for both runtimes of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    /// Shape of the first output line, read as a path value
    Shapes {
        constrained: PathShape,
        reference: PathShape,
    },
    /// Exact stdout text
    Outputs {
        constrained: String,
        reference: String,
    },
}

fn check_shape(side: &str, output: &ProbeOutput, expected: PathShape) -> Option<String> {
    let line = match output.first_line() {
        Some(line) => line,
        None => return Some(format!("{}: expected {} output, got none", side, expected)),
    };

    match PathValue::parse_rendered(line) {
        Ok(value) if value.shape() == expected => None,
        Ok(value) => Some(format!(
            "{}: expected {}, observed {} ({})",
            side,
            expected,
            value.shape(),
            line
        )),
        Err(e) => Some(format!("{}: {}", side, e)),
    }
}

fn check_output(side: &str, output: &ProbeOutput, expected: &str) -> Option<String> {
    if output.stdout == expected {
        None
    } else {
        Some(format!(
            "{}: expected {:?}, observed {:?}",
            side, expected, output.stdout
        ))
    }
}

impl Expectation {
    /// Violations, if any; an empty list means the expectation holds
    pub fn check(&self, constrained: &ProbeOutput, reference: &ProbeOutput) -> Vec<String> {
        let checks = match self {
            Expectation::Shapes {
                constrained: a,
                reference: b,
            } => [
                check_shape("constrained", constrained, *a),
                check_shape("reference", reference, *b),
            ],
            Expectation::Outputs {
                constrained: a,
                reference: b,
            } => [
                check_output("constrained", constrained, a),
                check_output("reference", reference, b),
            ],
        };
        checks.into_iter().flatten().collect()
    }
}

/// Expectations keyed by probe id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectationBook(BTreeMap<ProbeId, Expectation>);

impl ExpectationBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let book: Self = serde_json::from_str(text)?;
        if book.0.keys().any(|id| id.trim().is_empty()) {
            return Err(AppError::Config(
                "expectation keys must be probe ids".to_string(),
            ));
        }
        Ok(book)
    }

    pub fn insert(&mut self, probe_id: impl Into<ProbeId>, expectation: Expectation) {
        self.0.insert(probe_id.into(), expectation);
    }

    pub fn get(&self, probe_id: &str) -> Option<&Expectation> {
        self.0.get(probe_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
