// Domain Layer - Probes, metadata and the modeled import state

pub mod error;
pub mod import_env;
pub mod metadata;
pub mod path_value;
pub mod probe;
pub mod statement;

// Re-exports
pub use error::DomainError;
pub use import_env::{Fixture, FixtureKind, ImportEnvironment, ModuleCache, ResolvedModule};
pub use metadata::{parse_metadata, parse_probe_source, render_metadata_block};
pub use path_value::{PathShape, PathValue};
pub use probe::{Probe, ProbeBody, ProbeId, ProbeMetadata};
pub use statement::{ModuleAttribute, Statement};
