// Fixture installer - materializes package fixtures on disk before subprocess runs
// reason: tokio::fs for async file creation (ADR-001)
use std::path::{Path, PathBuf};
use tracing::info;

use divergence_core::domain::{Fixture, FixtureKind, ImportEnvironment};
use divergence_core::error::{AppError, Result};

/// Writes fixtures under a root directory and builds the matching environment
pub struct FixtureInstaller {
    root: PathBuf,
}

impl FixtureInstaller {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn root_str(&self) -> Result<String> {
        self.root
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::Config(format!("non UTF-8 fixture root: {}", self.root.display())))
    }

    /// Create `<root>/<name>/__init__.py` (package) or `<root>/<name>.py` (module)
    ///
    /// Existing files are left untouched, so installing twice is harmless.
    pub async fn install(&self, name: &str, kind: FixtureKind) -> Result<Fixture> {
        if name.is_empty() || name.split('.').any(|p| p.is_empty()) {
            return Err(AppError::Validation(format!("invalid fixture name '{}'", name)));
        }

        let root = self.root_str()?;
        let fixture = match kind {
            FixtureKind::Package => Fixture::package(name, root),
            FixtureKind::Module => Fixture::module(name, root),
        };

        let relative = name.replace('.', "/");
        let file = match kind {
            FixtureKind::Package => self.root.join(&relative).join("__init__.py"),
            FixtureKind::Module => self.root.join(format!("{}.py", relative)),
        };

        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if !tokio::fs::try_exists(&file).await? {
            tokio::fs::write(&file, "").await?;
            info!(fixture = %name, path = %file.display(), "Fixture installed");
        }

        Ok(fixture)
    }

    /// Install every package and return an environment that searches the root
    pub async fn install_packages(&self, names: &[&str]) -> Result<ImportEnvironment> {
        let mut env = ImportEnvironment::new().with_search_entry(self.root_str()?);
        for name in names {
            env = env.with_fixture(self.install(name, FixtureKind::Package).await?);
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_package_idempotent() {
        let root = std::env::temp_dir().join(format!("divergence_fixtures_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let installer = FixtureInstaller::new(&root);

        let env = installer.install_packages(&["modules"]).await.unwrap();
        installer.install("modules", FixtureKind::Package).await.unwrap();

        assert!(root.join("modules/__init__.py").is_file());
        assert_eq!(env.search_path().len(), 1);
        assert_eq!(
            env.resolve("modules").unwrap().location,
            format!("{}/modules", root.display())
        );

        installer.install("helpers.util", FixtureKind::Module).await.unwrap();
        assert!(root.join("helpers/util.py").is_file());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_rejects_empty_name() {
        let installer = FixtureInstaller::new(std::env::temp_dir());
        assert!(installer.install("", FixtureKind::Package).await.is_err());
        assert!(installer.install("a..b", FixtureKind::Module).await.is_err());
    }

    #[tokio::test]
    async fn test_existing_fixture_content_kept() {
        let root = std::env::temp_dir().join(format!("divergence_fixtures_keep_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("modules")).unwrap();
        std::fs::write(root.join("modules/__init__.py"), "x = 1\n").unwrap();

        FixtureInstaller::new(&root)
            .install("modules", FixtureKind::Package)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(root.join("modules/__init__.py")).unwrap(),
            "x = 1\n"
        );

        let _ = std::fs::remove_dir_all(&root);
    }
}
