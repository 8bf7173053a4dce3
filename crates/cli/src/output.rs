//! Terminal rendering for probe listings and run reports

use colored::Colorize;
use tabled::{Table, Tabled};

use divergence_core::application::{RunReport, Verdict};
use divergence_core::domain::Probe;

#[derive(Tabled)]
struct ProbeRow {
    id: String,
    categories: String,
    description: String,
}

#[derive(Tabled)]
struct ComparisonRow {
    probe: String,
    verdict: String,
    constrained: String,
    reference: String,
    warnings: String,
}

/// Single-line cell text; multi-line outputs are joined with " ⏎ "
fn cell(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" ⏎ ")
}

pub fn probe_table(probes: &[Probe]) -> String {
    let rows: Vec<ProbeRow> = probes
        .iter()
        .map(|p| ProbeRow {
            id: p.id.clone(),
            categories: p.metadata.categories_line(),
            description: p.metadata.description.clone(),
        })
        .collect();
    Table::new(rows).to_string()
}

pub fn print_report(report: &RunReport) {
    println!(
        "{} {} vs {}",
        "Divergence run".cyan().bold(),
        report.constrained_runtime,
        report.reference_runtime
    );
    println!("  {} {}", "Run ID:".bold(), report.run_id);
    println!("  {} {}", "Source:".bold(), report.source);
    println!();

    if report.comparisons.is_empty() {
        println!("{}", "No probes matched".yellow());
        return;
    }

    let rows: Vec<ComparisonRow> = report
        .comparisons
        .iter()
        .map(|c| ComparisonRow {
            probe: c.probe.id.clone(),
            verdict: c.verdict.label().to_string(),
            constrained: cell(&c.constrained.outcome.display_text()),
            reference: cell(&c.reference.outcome.display_text()),
            warnings: c
                .warnings
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        })
        .collect();
    println!("{}", Table::new(rows));
    println!();

    for comparison in &report.comparisons {
        match &comparison.verdict {
            Verdict::Errored { .. } | Verdict::Regression { .. } => {
                println!("  {} {}: {}", "✗".red(), comparison.probe.id, comparison.verdict)
            }
            Verdict::Identical => println!(
                "  {} {}: runtimes agree, divergence no longer observed",
                "!".yellow(),
                comparison.probe.id
            ),
            Verdict::Divergent => {}
        }
    }

    println!(
        "  {} {} divergent, {} identical, {} errored, {} regressions, {} warnings",
        "Summary:".bold(),
        report.count_divergent(),
        report.count_identical(),
        report.count_errored(),
        report.count_regressions(),
        report.count_warnings()
    );

    if report.is_clean() {
        println!("{}", "✓ Run clean".green().bold());
    } else {
        println!("{}", "✗ Run has failures".red().bold());
    }
}
