// Built-in probe catalog and in-memory probe source

use async_trait::async_trait;

use crate::application::constants::{EXAMPLE_FIXTURE_NAME, EXAMPLE_FIXTURE_ROOT};
use crate::domain::{Fixture, ImportEnvironment, Probe};
use crate::error::Result;
use crate::port::ProbeSource;

/// `__path__` is one string on constrained runtimes, a list on the reference
pub const CORE_IMPORT_PATH: &str = include_str!("../../probes/core_import_path.py");

/// (id, source) pairs shipped with the crate
const BUILTIN: [(&str, &str); 1] = [("core_import_path", CORE_IMPORT_PATH)];

/// Parse every built-in probe
pub fn builtin_probes() -> Result<Vec<Probe>> {
    BUILTIN
        .iter()
        .map(|(id, source)| Probe::from_source(*id, source).map_err(Into::into))
        .collect()
}

/// Import environment the built-in probes expect under the model engine
pub fn example_environment() -> ImportEnvironment {
    ImportEnvironment::new().with_fixture(Fixture::package(
        EXAMPLE_FIXTURE_NAME,
        EXAMPLE_FIXTURE_ROOT,
    ))
}

/// Probes held in memory
pub struct StaticProbeSource {
    name: String,
    probes: Vec<Probe>,
}

impl StaticProbeSource {
    pub fn new(name: impl Into<String>, mut probes: Vec<Probe>) -> Self {
        probes.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            name: name.into(),
            probes,
        }
    }

    pub fn builtin() -> Result<Self> {
        Ok(Self::new("builtin", builtin_probes()?))
    }
}

#[async_trait]
impl ProbeSource for StaticProbeSource {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn discover(&self) -> Result<Vec<Probe>> {
        Ok(self.probes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_probes_parse() {
        let probes = builtin_probes().unwrap();

        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].id, "core_import_path");
        assert!(probes[0].metadata.has_category("import"));
        assert!(probes[0].source_path.is_none());
    }

    #[test]
    fn test_example_environment_resolves_fixture() {
        let resolved = example_environment().resolve("modules").unwrap();
        assert_eq!(resolved.location, "/fake/path/to/modules");
    }

    #[tokio::test]
    async fn test_static_source_sorted() {
        let mut probes = builtin_probes().unwrap();
        let mut other = probes[0].clone();
        other.id = "a_first".to_string();
        probes.push(other);

        let source = StaticProbeSource::new("test", probes);
        let ids: Vec<String> = source
            .discover()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids, vec!["a_first", "core_import_path"]);
        assert_eq!(source.describe(), "test");
    }
}
