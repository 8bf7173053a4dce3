// Subprocess runtime implementation
// reason: async-trait, tokio for async process management (ADR-001)
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use divergence_core::application::constants::DEFAULT_ENV_ALLOWLIST;
use divergence_core::domain::{ImportEnvironment, Probe};
use divergence_core::port::{ExecutionError, ProbeOutput, ProbeRuntime, TimeProvider};

/// Markers a missing-module traceback carries on both interpreters
const IMPORT_ERROR_MARKERS: [&str; 2] = ["ModuleNotFoundError", "ImportError"];

/// How to launch one interpreter
#[derive(Debug, Clone)]
pub struct RuntimeCommand {
    /// Display name in reports
    pub name: String,
    pub program: String,
    /// Arguments placed before the script (or `-c <body>`)
    pub args: Vec<String>,
    /// Environment variable the interpreter reads its module search path from
    pub search_path_var: String,
    /// Separator used to join search path entries
    pub search_path_separator: String,
    pub timeout_ms: Option<i64>,
}

impl RuntimeCommand {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        search_path_var: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            search_path_var: search_path_var.into(),
            search_path_separator: ":".to_string(),
            timeout_ms: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<i64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Subprocess runtime
/// Spawns one interpreter process per execution with environment allowlisting (ADR-040)
pub struct SubprocessRuntime {
    command: RuntimeCommand,
    time_provider: Arc<dyn TimeProvider>,
    env_allowlist: Vec<String>,
}

impl SubprocessRuntime {
    /// Create a new subprocess runtime
    ///
    /// # Arguments
    /// * `command` - Interpreter launch description
    /// * `time_provider` - Time provider for duration tracking
    ///
    /// # Example
    /// ```ignore
    /// let runtime = SubprocessRuntime::new(
    ///     RuntimeCommand::new("cpython", "python3", "PYTHONPATH"),
    ///     Arc::new(SystemTimeProvider),
    /// );
    /// ```
    pub fn new(command: RuntimeCommand, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            command,
            time_provider,
            env_allowlist: DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_env_allowlist(mut self, env_allowlist: Vec<String>) -> Self {
        self.env_allowlist = env_allowlist;
        self
    }

    /// Filter environment variables to allowlist only (ADR-040)
    fn filter_env(&self, env: &HashMap<String, String>) -> HashMap<String, String> {
        env.iter()
            .filter(|(k, _)| self.env_allowlist.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Allowlisted parent environment plus the runtime's search path
    fn build_env(&self, import_env: &ImportEnvironment) -> HashMap<String, String> {
        let parent: HashMap<String, String> = std::env::vars().collect();
        let mut env = self.filter_env(&parent);

        if !import_env.search_path().is_empty() {
            env.insert(
                self.command.search_path_var.clone(),
                import_env
                    .search_path()
                    .join(&self.command.search_path_separator),
            );
        }
        env
    }

    /// Script path when the probe came from a file, inline body otherwise
    fn build_args(&self, probe: &Probe) -> Vec<String> {
        let mut args = self.command.args.clone();
        match &probe.source_path {
            Some(path) => args.push(path.to_string_lossy().into_owned()),
            None => {
                args.push("-c".to_string());
                args.push(probe.body.as_str().to_string());
            }
        }
        args
    }

    /// Spawn child process and wait for output
    async fn spawn_and_wait(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<std::process::Output, ExecutionError> {
        let mut command = Command::new(&self.command.program);
        command
            .args(args)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(format!("{}: {}", self.command.program, e)))?;

        if let Some(timeout_ms_val) = self.command.timeout_ms {
            match timeout(
                Duration::from_millis(timeout_ms_val.max(1) as u64),
                child.wait_with_output(),
            )
            .await
            {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(ExecutionError::IoError(e.to_string())),
                Err(_) => Err(ExecutionError::Timeout(timeout_ms_val)),
            }
        } else {
            child
                .wait_with_output()
                .await
                .map_err(|e| ExecutionError::IoError(e.to_string()))
        }
    }

    /// Build probe output from process output
    ///
    /// A failed exit whose stderr names an import error is a missing fixture;
    /// any other exit status is an observation and is returned as output.
    fn build_result(
        &self,
        output: std::process::Output,
        duration_ms: i64,
    ) -> Result<ProbeOutput, ExecutionError> {
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            if let Some(module) = missing_module(&stderr) {
                return Err(ExecutionError::FixtureMissing { module });
            }
        }

        Ok(ProbeOutput {
            stdout,
            stderr,
            exit_code: output.status.code(),
            duration_ms,
        })
    }
}

/// Extract the module name from an import-error traceback
fn missing_module(stderr: &str) -> Option<String> {
    let line = stderr
        .lines()
        .rev()
        .find(|l| IMPORT_ERROR_MARKERS.iter().any(|m| l.contains(m)))?;

    // "No module named 'x'" (reference) or "no module named 'x'" (constrained)
    let name = line
        .split('\'')
        .nth(1)
        .or_else(|| line.rsplit(' ').next())
        .unwrap_or_default()
        .trim()
        .to_string();

    Some(if name.is_empty() {
        "<unknown>".to_string()
    } else {
        name
    })
}

#[async_trait]
impl ProbeRuntime for SubprocessRuntime {
    fn name(&self) -> &str {
        &self.command.name
    }

    async fn execute(
        &self,
        probe: &Probe,
        env: &ImportEnvironment,
    ) -> Result<ProbeOutput, ExecutionError> {
        let args = self.build_args(probe);
        let process_env = self.build_env(env);
        let start_time = self.time_provider.now_millis();

        info!(
            probe = %probe.id,
            runtime = %self.command.name,
            program = %self.command.program,
            timeout_ms = ?self.command.timeout_ms,
            "Starting probe subprocess"
        );

        let output = self.spawn_and_wait(&args, &process_env).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;
        let result = self.build_result(output, duration_ms);

        debug!(
            probe = %probe.id,
            runtime = %self.command.name,
            duration_ms = %duration_ms,
            ok = result.is_ok(),
            "Probe subprocess completed"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use divergence_core::domain::{Fixture, ProbeBody, ProbeMetadata};
    use divergence_core::port::time_provider::SystemTimeProvider;

    fn probe(body: &str) -> Probe {
        let metadata = ProbeMetadata::new(["Core"], "shell probe", "cause", "").unwrap();
        Probe::new("shell_probe", metadata, ProbeBody::new(body))
    }

    fn sh(timeout_ms: Option<i64>) -> SubprocessRuntime {
        SubprocessRuntime::new(
            RuntimeCommand::new("sh", "sh", "PROBE_PATH").with_timeout_ms(timeout_ms),
            Arc::new(SystemTimeProvider),
        )
        .with_env_allowlist(vec!["PATH".to_string()])
    }

    #[tokio::test]
    async fn test_execute_success() {
        let output = sh(None)
            .execute(&probe("echo /fake/path/to/modules"), &ImportEnvironment::new())
            .await
            .unwrap();

        assert_eq!(output.stdout, "/fake/path/to/modules\n");
        assert!(output.is_success());
    }

    #[tokio::test]
    async fn test_search_path_exported() {
        let env = ImportEnvironment::new()
            .with_search_entry("/a")
            .with_fixture(Fixture::package("modules", "/b"));

        let output = sh(None)
            .execute(&probe("echo \"$PROBE_PATH\""), &env)
            .await
            .unwrap();

        assert_eq!(output.stdout, "/a:/b\n");
    }

    #[tokio::test]
    async fn test_import_error_maps_to_fixture_missing() {
        let body = "echo \"ImportError: no module named 'modules'\" >&2; exit 1";
        let err = sh(None)
            .execute(&probe(body), &ImportEnvironment::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ExecutionError::FixtureMissing {
                module: "modules".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_other_failure_is_observation() {
        let output = sh(None)
            .execute(&probe("echo partial; exit 3"), &ImportEnvironment::new())
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "partial\n");
    }

    #[tokio::test]
    async fn test_execute_timeout() {
        let result = sh(Some(100))
            .execute(&probe("sleep 10"), &ImportEnvironment::new())
            .await;

        assert!(matches!(result, Err(ExecutionError::Timeout(100))));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let runtime = SubprocessRuntime::new(
            RuntimeCommand::new("missing", "definitely-not-an-interpreter", "X"),
            Arc::new(SystemTimeProvider),
        );
        let result = runtime
            .execute(&probe("print(1)"), &ImportEnvironment::new())
            .await;

        assert!(matches!(result, Err(ExecutionError::SpawnFailed(_))));
    }

    #[test]
    fn test_env_filtering() {
        let runtime = sh(None).with_env_allowlist(vec!["ALLOWED_VAR".to_string()]);

        let mut env = HashMap::new();
        env.insert("ALLOWED_VAR".to_string(), "value1".to_string());
        env.insert("BLOCKED_VAR".to_string(), "value2".to_string());

        let filtered = runtime.filter_env(&env);

        assert_eq!(filtered.len(), 1);
        assert!(filtered.contains_key("ALLOWED_VAR"));
        assert!(!filtered.contains_key("BLOCKED_VAR"));
    }

    #[test]
    fn test_missing_module_parsing() {
        let cpython = "Traceback (most recent call last):\n  File \"x.py\", line 7\nModuleNotFoundError: No module named 'modules'\n";
        assert_eq!(missing_module(cpython), Some("modules".to_string()));

        let bare = "ImportError: no module named modules\n";
        assert_eq!(missing_module(bare), Some("modules".to_string()));

        assert_eq!(missing_module("SyntaxError: invalid syntax\n"), None);
    }
}
