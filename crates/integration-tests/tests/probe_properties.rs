//! Probe contract tests
//!
//! Determinism, metadata/body separation, the documented `__path__`
//! divergence and missing-fixture reporting, checked against the model engine.

use std::sync::Arc;

use divergence_core::application::catalog::{builtin_probes, example_environment, CORE_IMPORT_PATH};
use divergence_core::application::{ModelRuntime, PathStyle};
use divergence_core::domain::{parse_metadata, PathShape, PathValue, Probe};
use divergence_core::port::time_provider::FixedTimeProvider;
use divergence_core::port::{ExecutionError, ProbeRuntime};

fn runtimes() -> (ModelRuntime, ModelRuntime) {
    let clock = Arc::new(FixedTimeProvider(0));
    (
        ModelRuntime::constrained(clock.clone()),
        ModelRuntime::reference(clock),
    )
}

fn example_probe() -> Probe {
    builtin_probes()
        .unwrap()
        .into_iter()
        .find(|p| p.id == "core_import_path")
        .unwrap()
}

/// Same runtime, same environment: byte-identical stdout
#[tokio::test]
async fn test_repeated_execution_is_byte_identical() {
    let probe = example_probe();
    let env = example_environment();
    let (constrained, reference) = runtimes();

    for runtime in [&constrained, &reference] {
        let first = runtime.execute(&probe, &env).await.unwrap();
        let second = runtime.execute(&probe, &env).await.unwrap();
        assert_eq!(first.stdout.as_bytes(), second.stdout.as_bytes());
    }
}

/// Metadata parses even when the body could never run
#[test]
fn test_metadata_parses_without_body_execution() {
    let mangled = CORE_IMPORT_PATH.replace("print(modules.__path__)", "this is not code");
    let metadata = parse_metadata(&mangled).unwrap();

    assert_eq!(metadata, example_probe().metadata);
    assert!(Probe::from_source("mangled", &mangled)
        .unwrap()
        .body
        .statements()
        .is_err());
}

/// Both outputs are single lines that differ as scalar vs sequence
#[tokio::test]
async fn test_example_probe_documents_shape_divergence() {
    let probe = example_probe();
    let env = example_environment();
    let (constrained, reference) = runtimes();

    let a = constrained.execute(&probe, &env).await.unwrap();
    let b = reference.execute(&probe, &env).await.unwrap();

    assert_eq!(a.stdout, "/fake/path/to/modules\n");
    assert_eq!(b.stdout, "['/fake/path/to/modules']\n");
    assert_eq!(a.stdout.lines().count(), 1);
    assert_eq!(b.stdout.lines().count(), 1);

    let a_value = PathValue::parse_rendered(a.first_line().unwrap()).unwrap();
    let b_value = PathValue::parse_rendered(b.first_line().unwrap()).unwrap();

    assert_eq!(a_value.shape(), PathShape::Scalar);
    assert_eq!(b_value.shape(), PathShape::Sequence);
    // Same location, different shape
    assert_eq!(a_value.locations(), b_value.locations());
    assert_ne!(a.stdout, b.stdout);
}

/// Removing the fixture's search entry fails every runtime, with no output
#[tokio::test]
async fn test_missing_fixture_fails_on_every_runtime() {
    let probe = example_probe();
    let env = example_environment().without_search_entry("/fake/path/to");
    let (constrained, reference) = runtimes();

    for runtime in [&constrained, &reference] {
        let err = runtime.execute(&probe, &env).await.unwrap_err();
        assert_eq!(
            err,
            ExecutionError::FixtureMissing {
                module: "modules".to_string()
            }
        );
    }
}

/// Executions share no state: a failed run does not affect the next one
#[tokio::test]
async fn test_runs_are_isolated() {
    let probe = example_probe();
    let (constrained, _) = runtimes();
    let present = example_environment();
    let absent = present.clone().without_search_entry("/fake/path/to");

    let before = constrained.execute(&probe, &present).await.unwrap();
    assert!(constrained.execute(&probe, &absent).await.is_err());
    let after = constrained.execute(&probe, &present).await.unwrap();

    assert_eq!(before, after);
    assert_eq!(constrained.path_style(), PathStyle::Scalar);
}
