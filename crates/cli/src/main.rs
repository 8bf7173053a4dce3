//! Divergence CLI - collects probes and compares two runtimes

mod logging;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use divergence_core::application::catalog::example_environment;
use divergence_core::application::constants::{
    CONSTRAINED_RUNTIME_NAME, CONSTRAINED_SEARCH_PATH_VAR, DEFAULT_CONSTRAINED_CMD,
    DEFAULT_REFERENCE_CMD, DEFAULT_REPEAT, DEFAULT_TIMEOUT_MS, EXAMPLE_FIXTURE_NAME,
    REFERENCE_RUNTIME_NAME, REFERENCE_SEARCH_PATH_VAR,
};
use divergence_core::application::{
    render_rst, Collector, CollectorConfig, ExpectationBook, ModelRuntime, StaticProbeSource,
};
use divergence_core::domain::{render_metadata_block, ImportEnvironment};
use divergence_core::port::id_provider::UuidProvider;
use divergence_core::port::time_provider::SystemTimeProvider;
use divergence_core::port::{ProbeRuntime, ProbeSource, TimeProvider};
use divergence_infra_system::{
    DirectoryProbeSource, FixtureInstaller, RuntimeCommand, SubprocessRuntime,
};

#[derive(Parser)]
#[command(name = "divergence")]
#[command(about = "Runtime divergence probe collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory of probe files (built-in catalog when omitted)
    #[arg(long, global = true, env = "DIVERGENCE_PROBE_DIR")]
    dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List probes from their metadata (nothing is executed)
    List {
        /// Only probes carrying this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show one probe's metadata and body
    Show {
        /// Probe ID (file stem)
        probe_id: String,
    },

    /// Run probes on both runtimes and compare
    Run {
        /// Execution engine
        #[arg(long, value_enum, default_value = "model")]
        engine: Engine,

        /// Constrained interpreter command (subprocess engine)
        #[arg(long, env = "DIVERGENCE_CONSTRAINED_CMD", default_value = DEFAULT_CONSTRAINED_CMD)]
        constrained_cmd: String,

        /// Reference interpreter command (subprocess engine)
        #[arg(long, env = "DIVERGENCE_REFERENCE_CMD", default_value = DEFAULT_REFERENCE_CMD)]
        reference_cmd: String,

        /// Extra module search path entries (subprocess engine)
        #[arg(long, env = "DIVERGENCE_SEARCH_PATH", value_delimiter = ':')]
        search_path: Vec<String>,

        /// Directory to install the example package fixture into (subprocess engine)
        #[arg(long)]
        fixture_root: Option<String>,

        /// Executions per runtime per probe
        #[arg(long, env = "DIVERGENCE_REPEAT", default_value_t = DEFAULT_REPEAT)]
        repeat: usize,

        /// Per-execution timeout in milliseconds (subprocess engine)
        #[arg(long, env = "DIVERGENCE_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
        timeout_ms: i64,

        /// JSON file with per-probe expectations
        #[arg(long)]
        expectations: Option<String>,

        /// Only probes carrying this category
        #[arg(short, long)]
        category: Option<String>,

        /// Report format
        #[arg(long, value_enum, default_value = "table")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Engine {
    /// In-process interpreters over a modeled import environment
    Model,
    /// Real interpreter processes
    Subprocess,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
    Rst,
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

fn probe_source(dir: Option<&str>) -> Result<Box<dyn ProbeSource>> {
    match dir {
        Some(dir) => Ok(Box::new(DirectoryProbeSource::new(expand(dir)))),
        None => Ok(Box::new(
            StaticProbeSource::builtin().context("Built-in catalog is malformed")?,
        )),
    }
}

type RuntimePair = (Box<dyn ProbeRuntime>, Box<dyn ProbeRuntime>, ImportEnvironment);

fn model_runtimes(time_provider: Arc<dyn TimeProvider>) -> RuntimePair {
    let constrained: Box<dyn ProbeRuntime> =
        Box::new(ModelRuntime::constrained(time_provider.clone()));
    let reference: Box<dyn ProbeRuntime> = Box::new(ModelRuntime::reference(time_provider));
    (constrained, reference, example_environment())
}

struct SubprocessOptions {
    constrained_cmd: String,
    reference_cmd: String,
    search_path: Vec<String>,
    fixture_root: Option<String>,
    timeout_ms: i64,
}

/// Split a command line like "micropython -X heapsize=1M" into program and args
fn runtime_command(name: &str, command_line: &str, search_path_var: &str) -> Result<RuntimeCommand> {
    let mut parts = command_line.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .with_context(|| format!("Empty interpreter command for {}", name))?;
    Ok(RuntimeCommand::new(name, program, search_path_var).with_args(parts.collect()))
}

async fn subprocess_runtimes(
    options: &SubprocessOptions,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<RuntimePair> {
    let timeout = Some(options.timeout_ms).filter(|t| *t > 0);

    let constrained = runtime_command(
        CONSTRAINED_RUNTIME_NAME,
        &options.constrained_cmd,
        CONSTRAINED_SEARCH_PATH_VAR,
    )?
    .with_timeout_ms(timeout);
    let reference = runtime_command(
        REFERENCE_RUNTIME_NAME,
        &options.reference_cmd,
        REFERENCE_SEARCH_PATH_VAR,
    )?
    .with_timeout_ms(timeout);

    let mut env = match &options.fixture_root {
        Some(root) => FixtureInstaller::new(expand(root))
            .install_packages(&[EXAMPLE_FIXTURE_NAME])
            .await
            .context("Failed to install fixtures")?,
        None => ImportEnvironment::new(),
    };
    for entry in &options.search_path {
        env = env.with_search_entry(expand(entry));
    }

    let constrained: Box<dyn ProbeRuntime> =
        Box::new(SubprocessRuntime::new(constrained, time_provider.clone()));
    let reference: Box<dyn ProbeRuntime> =
        Box::new(SubprocessRuntime::new(reference, time_provider));

    Ok((constrained, reference, env))
}

async fn load_expectations(path: Option<&str>) -> Result<ExpectationBook> {
    match path {
        Some(path) => {
            let path = expand(path);
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read expectations from {}", path))?;
            ExpectationBook::from_json(&text)
                .with_context(|| format!("Invalid expectations file {}", path))
        }
        None => Ok(ExpectationBook::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let cli = Cli::parse();
    let source = probe_source(cli.dir.as_deref())?;

    match cli.command {
        Commands::List { category } => {
            let probes = source.discover().await?;
            let probes: Vec<_> = probes
                .into_iter()
                .filter(|p| category.as_deref().map_or(true, |c| p.metadata.has_category(c)))
                .collect();

            if probes.is_empty() {
                println!("{}", "No probes found".yellow());
            } else {
                println!("{}", output::probe_table(&probes));
                println!("{} probe(s) from {}", probes.len(), source.describe());
            }
        }

        Commands::Show { probe_id } => {
            let probes = source.discover().await?;
            let probe = probes
                .iter()
                .find(|p| p.id == probe_id)
                .with_context(|| format!("Probe '{}' not found in {}", probe_id, source.describe()))?;

            println!("{}", probe.id.cyan().bold());
            if let Some(path) = &probe.source_path {
                println!("{} {}", "Path:".bold(), path.display());
            }
            println!();
            print!("{}", render_metadata_block(&probe.metadata));
            print!("{}", probe.body.as_str());
        }

        Commands::Run {
            engine,
            constrained_cmd,
            reference_cmd,
            search_path,
            fixture_root,
            repeat,
            timeout_ms,
            expectations,
            category,
            format,
        } => {
            let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);

            let (constrained, reference, env) = match engine {
                Engine::Model => model_runtimes(time_provider.clone()),
                Engine::Subprocess => subprocess_runtimes(
                    &SubprocessOptions {
                        constrained_cmd,
                        reference_cmd,
                        search_path,
                        fixture_root,
                        timeout_ms,
                    },
                    time_provider.clone(),
                )
                .await?,
            };

            let config = CollectorConfig {
                repeat,
                category,
                expectations: load_expectations(expectations.as_deref()).await?,
            };
            let collector = Collector::new(config, time_provider, Arc::new(UuidProvider));

            info!(search_path = ?env.search_path(), "Import environment ready");

            let report = collector
                .run(source.as_ref(), constrained.as_ref(), reference.as_ref(), &env)
                .await?;

            match format {
                Format::Table => output::print_report(&report),
                Format::Json => println!("{}", report.to_json()?),
                Format::Rst => print!("{}", render_rst(&report)),
            }

            if !report.is_clean() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
