// Collector - discovers probes, runs them on both runtimes and compares
//
// Execution is strictly sequential: one probe, one runtime, one
// repetition at a time. Nothing is retried.

mod expectation;
mod verdict;

pub use expectation::{Expectation, ExpectationBook};
pub use verdict::{Comparison, Observation, Outcome, Verdict, Warning};

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::constants::DEFAULT_REPEAT;
use crate::application::report::RunReport;
use crate::domain::{ImportEnvironment, Probe};
use crate::error::Result;
use crate::port::{
    ExecutionError, IdProvider, ProbeOutput, ProbeRuntime, ProbeSource, TimeProvider,
};

/// Collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Executions per runtime per probe (minimum 1)
    pub repeat: usize,
    /// Only run probes carrying this category (case-insensitive)
    pub category: Option<String>,
    pub expectations: ExpectationBook,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            repeat: DEFAULT_REPEAT,
            category: None,
            expectations: ExpectationBook::new(),
        }
    }
}

/// Collector (differencing runner)
pub struct Collector {
    config: CollectorConfig,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl Collector {
    pub fn new(
        config: CollectorConfig,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            config,
            time_provider,
            id_provider,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Discover, execute and compare every probe from `source`
    ///
    /// # Errors
    /// - Discovery failures (malformed metadata, unreadable probe files).
    ///   Execution failures never abort the run; they become verdicts.
    pub async fn run(
        &self,
        source: &dyn ProbeSource,
        constrained: &dyn ProbeRuntime,
        reference: &dyn ProbeRuntime,
        env: &ImportEnvironment,
    ) -> Result<RunReport> {
        let run_id = self.id_provider.generate_id();
        let started_at = self.time_provider.now_millis();

        let probes: Vec<Probe> = source
            .discover()
            .await?
            .into_iter()
            .filter(|p| match &self.config.category {
                Some(category) => p.metadata.has_category(category),
                None => true,
            })
            .collect();

        info!(
            run_id = %run_id,
            source = %source.describe(),
            probes = probes.len(),
            constrained = %constrained.name(),
            reference = %reference.name(),
            "Starting divergence run"
        );

        let mut comparisons = Vec::with_capacity(probes.len());
        for probe in probes {
            comparisons.push(self.compare_probe(probe, constrained, reference, env).await);
        }

        let report = RunReport {
            run_id,
            source: source.describe(),
            constrained_runtime: constrained.name().to_string(),
            reference_runtime: reference.name().to_string(),
            started_at,
            finished_at: self.time_provider.now_millis(),
            comparisons,
        };

        info!(
            run_id = %report.run_id,
            divergent = report.count_divergent(),
            identical = report.count_identical(),
            errored = report.count_errored(),
            regressions = report.count_regressions(),
            "Divergence run completed"
        );

        Ok(report)
    }

    /// Run one probe on both runtimes and classify the pair
    pub async fn compare_probe(
        &self,
        probe: Probe,
        constrained: &dyn ProbeRuntime,
        reference: &dyn ProbeRuntime,
        env: &ImportEnvironment,
    ) -> Comparison {
        let a = self.observe(&probe, constrained, env).await;
        let b = self.observe(&probe, reference, env).await;

        let warnings: Vec<Warning> = [&a, &b]
            .iter()
            .filter(|o| !o.deterministic)
            .map(|o| Warning::NondeterministicOutput {
                runtime: o.runtime.clone(),
            })
            .collect();

        let verdict = Comparison::classify(&a, &b, self.config.expectations.get(&probe.id));

        match &verdict {
            Verdict::Errored { runtime, error } => {
                warn!(probe = %probe.id, runtime = %runtime, error = %error, "Probe errored")
            }
            Verdict::Regression { reasons } => {
                warn!(probe = %probe.id, reasons = ?reasons, "Probe expectation violated")
            }
            Verdict::Identical => {
                warn!(probe = %probe.id, "Runtimes agree; divergence no longer observed")
            }
            Verdict::Divergent => info!(probe = %probe.id, "Divergence observed"),
        }
        for warning in &warnings {
            warn!(probe = %probe.id, warning = %warning, "Probe flagged as unreliable");
        }

        Comparison {
            probe,
            constrained: a,
            reference: b,
            verdict,
            warnings,
        }
    }

    /// Execute `repeat` times, keeping the first outcome
    ///
    /// An error ends the repetition: it is reported, not retried.
    async fn observe(
        &self,
        probe: &Probe,
        runtime: &dyn ProbeRuntime,
        env: &ImportEnvironment,
    ) -> Observation {
        let repeat = self.config.repeat.max(1);

        let first = into_outcome(runtime.execute(probe, env).await);
        let mut executions = 1;
        let mut deterministic = true;

        if matches!(first, Outcome::Output(_)) {
            while executions < repeat {
                let next = into_outcome(runtime.execute(probe, env).await);
                executions += 1;
                if !first.same_observation(&next) {
                    deterministic = false;
                }
            }
        }

        Observation {
            runtime: runtime.name().to_string(),
            outcome: first,
            executions,
            deterministic,
        }
    }
}

fn into_outcome(result: std::result::Result<ProbeOutput, ExecutionError>) -> Outcome {
    match result {
        Ok(output) => Outcome::Output(output),
        Err(error) => Outcome::Error(error),
    }
}
