// Application Layer - Use Cases (collection, comparison, reporting)

pub mod catalog;
pub mod collector;
pub mod constants;
pub mod model_runtime;
pub mod report;

// Re-exports
pub use catalog::StaticProbeSource;
pub use collector::{Collector, CollectorConfig, Comparison, Expectation, ExpectationBook, Verdict};
pub use model_runtime::{ModelRuntime, PathStyle};
pub use report::{render_rst, RunReport};
