// Comparison results

use serde::{Deserialize, Serialize};

use crate::domain::Probe;
use crate::port::{ExecutionError, ProbeOutput};

/// What one runtime produced for a probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Output(ProbeOutput),
    Error(ExecutionError),
}

impl Outcome {
    pub fn output(&self) -> Option<&ProbeOutput> {
        match self {
            Outcome::Output(output) => Some(output),
            Outcome::Error(_) => None,
        }
    }

    /// Text shown in reports: stdout, or the error message
    pub fn display_text(&self) -> String {
        match self {
            Outcome::Output(output) => output.stdout.clone(),
            Outcome::Error(error) => error.to_string(),
        }
    }

    /// Equality used for repeat checks: stdout bytes and exit status
    pub fn same_observation(&self, other: &Outcome) -> bool {
        match (self, other) {
            (Outcome::Output(a), Outcome::Output(b)) => {
                a.stdout == b.stdout && a.exit_code == b.exit_code
            }
            (Outcome::Error(a), Outcome::Error(b)) => a == b,
            _ => false,
        }
    }
}

/// First observation of a runtime plus the number of executions behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub runtime: String,
    pub outcome: Outcome,
    pub executions: usize,
    pub deterministic: bool,
}

/// Advisory findings; never fail a run on their own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Repeated runs on one runtime disagreed
    NondeterministicOutput { runtime: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NondeterministicOutput { runtime } => {
                write!(f, "nondeterministic output on {}", runtime)
            }
        }
    }
}

/// Classification of one probe across both runtimes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Runtimes disagree: the documented divergence was observed
    Divergent,
    /// Runtimes agree: the divergence is no longer observed
    Identical,
    /// A runtime reported an error (e.g. missing fixture)
    Errored {
        runtime: String,
        error: ExecutionError,
    },
    /// An attached expectation was violated
    Regression { reasons: Vec<String> },
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Divergent => "DIVERGENT",
            Verdict::Identical => "IDENTICAL",
            Verdict::Errored { .. } => "ERRORED",
            Verdict::Regression { .. } => "REGRESSION",
        }
    }

    /// Errors and regressions fail a run; the rest is informational
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Errored { .. } | Verdict::Regression { .. })
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Errored { runtime, error } => write!(f, "ERRORED ({}: {})", runtime, error),
            Verdict::Regression { reasons } => write!(f, "REGRESSION ({})", reasons.join("; ")),
            other => f.write_str(other.label()),
        }
    }
}

/// Full result for one probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub probe: Probe,
    pub constrained: Observation,
    pub reference: Observation,
    pub verdict: Verdict,
    pub warnings: Vec<Warning>,
}

impl Comparison {
    /// Build the verdict for a pair of observations
    ///
    /// Errors win over everything; an expectation, when given, decides
    /// regressions; otherwise outputs are simply compared.
    pub fn classify(
        constrained: &Observation,
        reference: &Observation,
        expectation: Option<&super::Expectation>,
    ) -> Verdict {
        for observation in [constrained, reference] {
            if let Outcome::Error(error) = &observation.outcome {
                return Verdict::Errored {
                    runtime: observation.runtime.clone(),
                    error: error.clone(),
                };
            }
        }

        if let (Some(expectation), Some(a), Some(b)) = (
            expectation,
            constrained.outcome.output(),
            reference.outcome.output(),
        ) {
            let reasons = expectation.check(a, b);
            if !reasons.is_empty() {
                return Verdict::Regression { reasons };
            }
        }

        if constrained.outcome.same_observation(&reference.outcome) {
            Verdict::Identical
        } else {
            Verdict::Divergent
        }
    }
}
