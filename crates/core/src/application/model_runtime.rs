// Model runtime - in-process interpreter for probe bodies
//
// Executes the statement subset probes use (import, print) against an
// explicit ImportEnvironment. The only behavioral knob is how a
// package's `__path__` is represented.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::application::constants::{CONSTRAINED_RUNTIME_NAME, REFERENCE_RUNTIME_NAME};
use crate::domain::{
    FixtureKind, ImportEnvironment, ModuleAttribute, ModuleCache, PathValue, Probe,
    ResolvedModule, Statement,
};
use crate::port::{ExecutionError, ProbeOutput, ProbeRuntime, TimeProvider};

/// How a runtime represents a package's `__path__`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// Single directory string (constrained runtimes)
    Scalar,
    /// List of directory strings (reference runtime)
    Sequence,
}

pub struct ModelRuntime {
    name: String,
    path_style: PathStyle,
    time_provider: Arc<dyn TimeProvider>,
}

impl ModelRuntime {
    pub fn new(
        name: impl Into<String>,
        path_style: PathStyle,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            path_style,
            time_provider,
        }
    }

    pub fn constrained(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::new(CONSTRAINED_RUNTIME_NAME, PathStyle::Scalar, time_provider)
    }

    pub fn reference(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::new(REFERENCE_RUNTIME_NAME, PathStyle::Sequence, time_provider)
    }

    pub fn path_style(&self) -> PathStyle {
        self.path_style
    }

    fn path_value(&self, module: &ResolvedModule) -> PathValue {
        match self.path_style {
            PathStyle::Scalar => PathValue::Scalar(module.location.clone()),
            PathStyle::Sequence => PathValue::Sequence(vec![module.location.clone()]),
        }
    }

    fn render_attribute(
        &self,
        module: &ResolvedModule,
        attribute: ModuleAttribute,
    ) -> Result<String, ExecutionError> {
        match attribute {
            ModuleAttribute::Path => match module.kind {
                FixtureKind::Package => Ok(self.path_value(module).render()),
                FixtureKind::Module => Err(ExecutionError::AttributeMissing {
                    module: module.name.clone(),
                    attribute: attribute.to_string(),
                }),
            },
            ModuleAttribute::Name => Ok(module.name.clone()),
            ModuleAttribute::File => Ok(module.file()),
        }
    }

    /// Run statements to completion, returning stdout
    ///
    /// Output is only returned when every statement succeeds, so a failed
    /// import never leaves partial output behind.
    pub fn run_statements(
        &self,
        statements: &[Statement],
        env: &ImportEnvironment,
    ) -> Result<String, ExecutionError> {
        let mut cache = ModuleCache::new();
        let mut stdout = String::new();

        for statement in statements {
            match statement {
                Statement::Import { module } => {
                    cache
                        .import(env, module)
                        .ok_or_else(|| ExecutionError::FixtureMissing {
                            module: module.clone(),
                        })?;
                }
                Statement::Print { module, attribute } => {
                    let resolved = cache
                        .get(module)
                        .ok_or_else(|| ExecutionError::NameNotDefined(module.clone()))?;
                    let text = match attribute {
                        Some(attr) => self.render_attribute(resolved, *attr)?,
                        None => format!("<module '{}' from '{}'>", resolved.name, resolved.file()),
                    };
                    stdout.push_str(&text);
                    stdout.push('\n');
                }
            }
        }

        Ok(stdout)
    }
}

#[async_trait]
impl ProbeRuntime for ModelRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        probe: &Probe,
        env: &ImportEnvironment,
    ) -> Result<ProbeOutput, ExecutionError> {
        let start_time = self.time_provider.now_millis();

        let statements = probe
            .body
            .statements()
            .map_err(|e| ExecutionError::UnsupportedStatement(e.to_string()))?;

        let stdout = self.run_statements(&statements, env)?;
        let duration_ms = self.time_provider.now_millis() - start_time;

        debug!(
            probe = %probe.id,
            runtime = %self.name,
            duration_ms = duration_ms,
            "Model execution completed"
        );

        Ok(ProbeOutput::success(stdout, duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Fixture, ProbeBody, ProbeMetadata};
    use crate::port::time_provider::FixedTimeProvider;

    fn probe(body: &str) -> Probe {
        let metadata = ProbeMetadata::new(["Core"], "test probe", "cause", "").unwrap();
        Probe::new("test_probe", metadata, ProbeBody::new(body))
    }

    fn env() -> ImportEnvironment {
        ImportEnvironment::new()
            .with_fixture(Fixture::package("modules", "/fake/path/to"))
            .with_fixture(Fixture::module("helper", "/fake/path/to"))
    }

    #[tokio::test]
    async fn test_path_style_controls_shape() {
        let clock = Arc::new(FixedTimeProvider(0));
        let body = probe("import modules\nprint(modules.__path__)\n");

        let constrained = ModelRuntime::constrained(clock.clone());
        let reference = ModelRuntime::reference(clock);

        let a = constrained.execute(&body, &env()).await.unwrap();
        let b = reference.execute(&body, &env()).await.unwrap();

        assert_eq!(a.stdout, "/fake/path/to/modules\n");
        assert_eq!(b.stdout, "['/fake/path/to/modules']\n");
        assert_eq!(a.duration_ms, 0);
    }

    #[tokio::test]
    async fn test_missing_fixture_reports_no_output() {
        let runtime = ModelRuntime::reference(Arc::new(FixedTimeProvider(0)));
        let body = probe("import helper\nprint(helper.__name__)\nimport modules\n");
        let env = env().without_search_entry("/fake/path/to");

        let err = runtime.execute(&body, &env).await.unwrap_err();

        assert_eq!(
            err,
            ExecutionError::FixtureMissing {
                module: "helper".to_string()
            }
        );
    }

    #[test]
    fn test_module_has_no_path() {
        let runtime = ModelRuntime::constrained(Arc::new(FixedTimeProvider(0)));
        let stmts = probe("import helper\nprint(helper.__path__)\n")
            .body
            .statements()
            .unwrap();

        let err = runtime.run_statements(&stmts, &env()).unwrap_err();
        assert!(matches!(err, ExecutionError::AttributeMissing { .. }));
    }

    #[test]
    fn test_print_requires_import() {
        let runtime = ModelRuntime::constrained(Arc::new(FixedTimeProvider(0)));
        let stmts = probe("print(modules.__name__)\n").body.statements().unwrap();

        let err = runtime.run_statements(&stmts, &env()).unwrap_err();
        assert_eq!(err, ExecutionError::NameNotDefined("modules".to_string()));
    }

    #[test]
    fn test_name_file_and_module_repr() {
        let runtime = ModelRuntime::reference(Arc::new(FixedTimeProvider(0)));
        let stmts = probe("import modules\nprint(modules.__name__)\nprint(modules.__file__)\nprint(modules)\n")
            .body
            .statements()
            .unwrap();

        let out = runtime.run_statements(&stmts, &env()).unwrap();
        assert_eq!(
            out,
            "modules\n/fake/path/to/modules/__init__.py\n<module 'modules' from '/fake/path/to/modules/__init__.py'>\n"
        );
    }

    #[tokio::test]
    async fn test_unsupported_body() {
        let runtime = ModelRuntime::reference(Arc::new(FixedTimeProvider(0)));
        let err = runtime
            .execute(&probe("import os\nos.getcwd()\n"), &env())
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::UnsupportedStatement(_)));
    }
}
