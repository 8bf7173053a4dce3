// Divergence Infrastructure - System Adapters
// Implements: ProbeRuntime (subprocess), ProbeSource (directory) (ADR-002)

pub mod directory_source;
pub mod fixture_installer;
pub mod subprocess_runtime;

pub use directory_source::DirectoryProbeSource;
pub use fixture_installer::FixtureInstaller;
pub use subprocess_runtime::{RuntimeCommand, SubprocessRuntime};
