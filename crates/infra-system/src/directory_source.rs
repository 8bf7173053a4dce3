// Directory probe source
// reason: tokio::fs for async discovery (ADR-001)
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use divergence_core::application::constants::PROBE_FILE_EXTENSION;
use divergence_core::domain::Probe;
use divergence_core::error::{AppError, Result};
use divergence_core::port::ProbeSource;

/// Probes stored one per file in a directory (non-recursive)
///
/// The file stem is the probe id. Only metadata is parsed; nothing is run.
pub struct DirectoryProbeSource {
    dir: PathBuf,
}

impl DirectoryProbeSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load(&self, path: &Path) -> Result<Probe> {
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AppError::Validation(format!("invalid probe file name: {}", path.display())))?;

        let source = tokio::fs::read_to_string(path).await?;
        let probe = Probe::from_source(id, &source).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Malformed probe file");
            AppError::Domain(e)
        })?;

        debug!(probe = %probe.id, path = %path.display(), "Probe loaded");
        Ok(probe.with_source_path(path))
    }
}

#[async_trait]
impl ProbeSource for DirectoryProbeSource {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    async fn discover(&self) -> Result<Vec<Probe>> {
        if !tokio::fs::metadata(&self.dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(AppError::NotFound(format!(
                "probe directory {}",
                self.dir.display()
            )));
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_probe = path
                .extension()
                .is_some_and(|ext| ext == PROBE_FILE_EXTENSION);
            if is_probe && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut probes = Vec::with_capacity(paths.len());
        for path in &paths {
            probes.push(self.load(path).await?);
        }
        probes.sort_by(|a, b| a.id.cmp(&b.id));

        info!(dir = %self.dir.display(), count = probes.len(), "Probes discovered");
        Ok(probes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use divergence_core::application::catalog::CORE_IMPORT_PATH;
    use divergence_core::domain::DomainError;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "divergence_test_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_discover_sorted_probes() {
        let dir = scratch_dir("discover");
        std::fs::write(dir.join("core_import_path.py"), CORE_IMPORT_PATH).unwrap();
        std::fs::write(dir.join("another.py"), CORE_IMPORT_PATH).unwrap();
        std::fs::write(dir.join("README.txt"), "not a probe").unwrap();
        std::fs::create_dir_all(dir.join("nested.py")).unwrap();

        let probes = DirectoryProbeSource::new(&dir).discover().await.unwrap();

        let ids: Vec<&str> = probes.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["another", "core_import_path"]);
        assert_eq!(
            probes[1].source_path.as_deref(),
            Some(dir.join("core_import_path.py").as_path())
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_malformed_probe_is_domain_error() {
        let dir = scratch_dir("malformed");
        std::fs::write(dir.join("broken.py"), "import modules\n").unwrap();

        let err = DirectoryProbeSource::new(&dir).discover().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::MetadataParse { line: 1, .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let source = DirectoryProbeSource::new("/nonexistent/divergence/probes");
        assert!(matches!(source.discover().await, Err(AppError::NotFound(_))));
    }
}
