// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod probe_runtime;
pub mod probe_source;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use probe_runtime::{ExecutionError, ProbeOutput, ProbeRuntime};
pub use probe_source::ProbeSource;
pub use time_provider::TimeProvider;
