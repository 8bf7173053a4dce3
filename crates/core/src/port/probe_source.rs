// Probe Source Port
// Discovery of probes for the collector (directory scan, built-in catalog)

use crate::domain::Probe;
use crate::error::Result;
use async_trait::async_trait;

/// Probe source trait
///
/// Implementations:
/// - StaticProbeSource: probes held in memory (built-in catalog, tests)
/// - DirectoryProbeSource: probe files discovered on disk
#[async_trait]
pub trait ProbeSource: Send + Sync {
    /// Short description for logs (directory path, "builtin", ...)
    fn describe(&self) -> String;

    /// Load every probe, parsing metadata only
    ///
    /// Implementations return probes sorted by id.
    ///
    /// # Errors
    /// - AppError::Domain if a probe's metadata block is malformed
    /// - AppError::Io if the underlying storage cannot be read
    async fn discover(&self) -> Result<Vec<Probe>>;
}
