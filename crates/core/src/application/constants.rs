// Collector constants (ADR: No magic values)

/// Executions per runtime per probe; two is enough to catch nondeterminism
pub const DEFAULT_REPEAT: usize = 2;

/// Default per-execution timeout for subprocess runtimes (10s)
pub const DEFAULT_TIMEOUT_MS: i64 = 10_000;

/// Interpreter command for the constrained runtime
pub const DEFAULT_CONSTRAINED_CMD: &str = "micropython";

/// Interpreter command for the reference runtime
pub const DEFAULT_REFERENCE_CMD: &str = "python3";

/// Environment variable the constrained interpreter reads its search path from
pub const CONSTRAINED_SEARCH_PATH_VAR: &str = "MICROPYPATH";

/// Environment variable the reference interpreter reads its search path from
pub const REFERENCE_SEARCH_PATH_VAR: &str = "PYTHONPATH";

/// Display names used when runtimes are not named explicitly
pub const CONSTRAINED_RUNTIME_NAME: &str = "constrained";
pub const REFERENCE_RUNTIME_NAME: &str = "reference";

/// Package fixture imported by the built-in example probe
pub const EXAMPLE_FIXTURE_NAME: &str = "modules";

/// Search path entry the model engine places the example fixture under
pub const EXAMPLE_FIXTURE_ROOT: &str = "/fake/path/to";

/// Environment variables passed through to subprocess runtimes
pub const DEFAULT_ENV_ALLOWLIST: [&str; 4] = ["PATH", "HOME", "USER", "LANG"];

/// Probe file extension picked up by directory discovery
pub const PROBE_FILE_EXTENSION: &str = "py";
