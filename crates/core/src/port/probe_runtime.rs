// Probe Runtime Port
// Abstraction for executing a probe body under one target runtime (in-process model or subprocess)

use crate::domain::{ImportEnvironment, Probe};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Captured result of one probe execution
///
/// `stdout` is kept byte-exact (decoded lossily), trailing newline included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: i64,
}

impl ProbeOutput {
    pub fn success(stdout: impl Into<String>, duration_ms: i64) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// First stdout line without its terminator
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().next()
    }
}

/// Execution errors
///
/// Propagated unmodified to the collector; nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionError {
    #[error("Fixture missing: no module named '{module}' on the import search path")]
    FixtureMissing { module: String },

    #[error("Attribute missing: module '{module}' has no attribute '{attribute}'")]
    AttributeMissing { module: String, attribute: String },

    #[error("Name not defined: '{0}'")]
    NameNotDefined(String),

    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process timeout after {0}ms")]
    Timeout(i64),

    #[error("IO error: {0}")]
    IoError(String),
}

impl ExecutionError {
    /// Environment misconfiguration rather than an observed behavior
    pub fn is_fixture_missing(&self) -> bool {
        matches!(self, ExecutionError::FixtureMissing { .. })
    }
}

/// Probe Runtime trait
///
/// Implementations:
/// - ModelRuntime: interprets the body in-process against an ImportEnvironment
/// - SubprocessRuntime: runs a real interpreter command
#[async_trait]
pub trait ProbeRuntime: Send + Sync {
    /// Display name used in reports and logs (e.g. "micropython", "cpython")
    fn name(&self) -> &str;

    /// Execute a probe body once and capture its output
    ///
    /// # Errors
    /// - ExecutionError::FixtureMissing if a module the body imports is not on the search path
    /// - ExecutionError::SpawnFailed / Timeout for subprocess runtimes
    async fn execute(
        &self,
        probe: &Probe,
        env: &ImportEnvironment,
    ) -> Result<ProbeOutput, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock runtime behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always print the same text
        Fixed(String),
        /// Print each text in turn, repeating the last one
        Sequence(Vec<String>),
        /// Always fail
        Fail(ExecutionError),
    }

    /// Mock ProbeRuntime for testing
    pub struct MockProbeRuntime {
        name: String,
        behavior: MockBehavior,
        pending: Arc<Mutex<VecDeque<String>>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockProbeRuntime {
        pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
            let pending = match &behavior {
                MockBehavior::Sequence(items) => items.iter().cloned().collect(),
                _ => VecDeque::new(),
            };
            Self {
                name: name.into(),
                behavior,
                pending: Arc::new(Mutex::new(pending)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn fixed(name: impl Into<String>, stdout: impl Into<String>) -> Self {
            Self::new(name, MockBehavior::Fixed(stdout.into()))
        }

        pub fn failing(name: impl Into<String>, error: ExecutionError) -> Self {
            Self::new(name, MockBehavior::Fail(error))
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl ProbeRuntime for MockProbeRuntime {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(
            &self,
            _probe: &Probe,
            _env: &ImportEnvironment,
        ) -> Result<ProbeOutput, ExecutionError> {
            *self.call_count.lock().unwrap() += 1;

            match &self.behavior {
                MockBehavior::Fixed(text) => Ok(ProbeOutput::success(text.clone(), 1)),
                MockBehavior::Sequence(items) => {
                    let mut pending = self.pending.lock().unwrap();
                    let text = if pending.len() > 1 {
                        pending.pop_front()
                    } else {
                        pending.front().cloned()
                    };
                    Ok(ProbeOutput::success(
                        text.or_else(|| items.last().cloned()).unwrap_or_default(),
                        1,
                    ))
                }
                MockBehavior::Fail(error) => Err(error.clone()),
            }
        }
    }
}
