// Import environment (explicit replacement for process-wide import state)
//
// Every execution receives an ImportEnvironment; the module cache lives
// for one execution only, so runs never contaminate each other.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of fixture registered with the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureKind {
    /// Directory with an `__init__` file; carries `__path__`
    Package,
    /// Single source file; has no `__path__`
    Module,
}

/// A package or module the collector guarantees to exist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub name: String,
    pub kind: FixtureKind,
    /// Search path entry the fixture lives under
    pub root: String,
}

impl Fixture {
    pub fn package(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FixtureKind::Package,
            root: root.into(),
        }
    }

    pub fn module(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FixtureKind::Module,
            root: root.into(),
        }
    }

    /// Directory of a package, or file of a module
    pub fn location(&self) -> String {
        let root = self.root.trim_end_matches('/');
        let relative = self.name.replace('.', "/");
        match self.kind {
            FixtureKind::Package => format!("{}/{}", root, relative),
            FixtureKind::Module => format!("{}/{}.py", root, relative),
        }
    }
}

/// Module found on the search path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub name: String,
    pub kind: FixtureKind,
    pub location: String,
}

impl ResolvedModule {
    /// `__file__` value: the package's `__init__.py` or the module file
    pub fn file(&self) -> String {
        match self.kind {
            FixtureKind::Package => format!("{}/__init__.py", self.location),
            FixtureKind::Module => self.location.clone(),
        }
    }
}

/// Search path plus the fixtures registered under it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEnvironment {
    search_path: Vec<String>,
    fixtures: Vec<Fixture>,
}

impl ImportEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_entry(mut self, entry: impl Into<String>) -> Self {
        let entry = entry.into();
        if !self.search_path.contains(&entry) {
            self.search_path.push(entry);
        }
        self
    }

    /// Register a fixture and make sure its root is searched
    pub fn with_fixture(mut self, fixture: Fixture) -> Self {
        let root = fixture.root.clone();
        self.fixtures.retain(|f| !(f.name == fixture.name && f.root == fixture.root));
        self.fixtures.push(fixture);
        self.with_search_entry(root)
    }

    /// Same environment with one search entry removed; fixtures under it
    /// stay registered but become unreachable
    pub fn without_search_entry(mut self, entry: &str) -> Self {
        self.search_path.retain(|e| e != entry);
        self
    }

    pub fn search_path(&self) -> &[String] {
        &self.search_path
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// First match wins, in search path order
    pub fn resolve(&self, name: &str) -> Option<ResolvedModule> {
        self.search_path.iter().find_map(|entry| {
            self.fixtures
                .iter()
                .find(|f| f.name == name && &f.root == entry)
                .map(|f| ResolvedModule {
                    name: f.name.clone(),
                    kind: f.kind,
                    location: f.location(),
                })
        })
    }
}

/// Loaded-module cache for a single execution
#[derive(Debug, Default)]
pub struct ModuleCache {
    loaded: BTreeMap<String, ResolvedModule>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import through the cache; `None` means the module is not on the search path
    pub fn import(&mut self, env: &ImportEnvironment, name: &str) -> Option<&ResolvedModule> {
        if !self.loaded.contains_key(name) {
            let resolved = env.resolve(name)?;
            self.loaded.insert(name.to_string(), resolved);
        }
        self.loaded.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedModule> {
        self.loaded.get(name)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_follows_search_order() {
        let env = ImportEnvironment::new()
            .with_search_entry("/second")
            .with_fixture(Fixture::package("modules", "/first"))
            .with_fixture(Fixture::package("modules", "/second"));

        let resolved = env.resolve("modules").unwrap();
        assert_eq!(resolved.location, "/second/modules");
        assert_eq!(resolved.file(), "/second/modules/__init__.py");
    }

    #[test]
    fn test_removed_entry_hides_fixture() {
        let env = ImportEnvironment::new()
            .with_fixture(Fixture::package("modules", "/fake/path/to"))
            .without_search_entry("/fake/path/to");

        assert!(env.resolve("modules").is_none());
        assert_eq!(env.fixtures().len(), 1);
    }

    #[test]
    fn test_module_fixture_location() {
        let fixture = Fixture::module("pkg.util", "/root/");
        assert_eq!(fixture.location(), "/root/pkg/util.py");
    }

    #[test]
    fn test_cache_is_per_instance() {
        let env = ImportEnvironment::new().with_fixture(Fixture::package("modules", "/r"));

        let mut first = ModuleCache::new();
        assert!(first.import(&env, "modules").is_some());
        assert!(first.import(&env, "missing").is_none());
        assert_eq!(first.len(), 1);

        let second = ModuleCache::new();
        assert!(second.is_empty());
    }
}
