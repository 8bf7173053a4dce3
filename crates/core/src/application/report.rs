// Run report and its renderings (JSON, reStructuredText)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::application::collector::{Comparison, Verdict};
use crate::error::Result;

/// Outcome of one collector run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub source: String,
    pub constrained_runtime: String,
    pub reference_runtime: String,
    pub started_at: i64, // epoch ms
    pub finished_at: i64,
    pub comparisons: Vec<Comparison>,
}

impl RunReport {
    fn count(&self, pred: impl Fn(&Verdict) -> bool) -> usize {
        self.comparisons.iter().filter(|c| pred(&c.verdict)).count()
    }

    pub fn count_divergent(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Divergent))
    }

    pub fn count_identical(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Identical))
    }

    pub fn count_errored(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Errored { .. }))
    }

    pub fn count_regressions(&self) -> usize {
        self.count(|v| matches!(v, Verdict::Regression { .. }))
    }

    pub fn count_warnings(&self) -> usize {
        self.comparisons.iter().map(|c| c.warnings.len()).sum()
    }

    /// No errors and no regressions
    pub fn is_clean(&self) -> bool {
        !self.comparisons.iter().any(|c| c.verdict.is_failure())
    }

    pub fn find(&self, probe_id: &str) -> Option<&Comparison> {
        self.comparisons.iter().find(|c| c.probe.id == probe_id)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn underline(title: &str, ch: char) -> String {
    format!("{}\n{}\n", title, ch.to_string().repeat(title.chars().count()))
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Two-column RST grid table; cells may span several lines
fn grid_table(headers: [&str; 2], cells: [&str; 2]) -> String {
    let columns: Vec<Vec<&str>> = cells
        .iter()
        .map(|c| {
            let lines: Vec<&str> = c.lines().collect();
            if lines.is_empty() {
                vec![""]
            } else {
                lines
            }
        })
        .collect();

    let widths: Vec<usize> = (0..2)
        .map(|i| {
            columns[i]
                .iter()
                .map(|l| l.chars().count())
                .chain(std::iter::once(headers[i].chars().count()))
                .max()
                .unwrap_or(0)
                + 2
        })
        .collect();

    let border = |ch: char| {
        format!(
            "+{}+{}+\n",
            ch.to_string().repeat(widths[0]),
            ch.to_string().repeat(widths[1])
        )
    };
    let row = |a: &str, b: &str| {
        format!(
            "| {:<w0$} | {:<w1$} |\n",
            a,
            b,
            w0 = widths[0] - 2,
            w1 = widths[1] - 2
        )
    };

    let mut out = border('-');
    out.push_str(&row(headers[0], headers[1]));
    out.push_str(&border('='));
    let height = columns[0].len().max(columns[1].len());
    for i in 0..height {
        out.push_str(&row(
            columns[0].get(i).copied().unwrap_or(""),
            columns[1].get(i).copied().unwrap_or(""),
        ));
    }
    out.push_str(&border('-'));
    out
}

/// Documentation page listing every observed divergence
///
/// Probes are grouped by their category set. Identical and errored probes
/// are left out: the page documents differences, not harness failures.
pub fn render_rst(report: &RunReport) -> String {
    let mut groups: BTreeMap<String, Vec<&Comparison>> = BTreeMap::new();
    for comparison in &report.comparisons {
        if matches!(comparison.verdict, Verdict::Divergent) {
            let key = comparison
                .probe
                .metadata
                .categories
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            groups.entry(key).or_default().push(comparison);
        }
    }

    let mut out = underline(
        &format!(
            "Differences between {} and {}",
            report.constrained_runtime, report.reference_runtime
        ),
        '=',
    );
    out.push('\n');

    for (category, comparisons) in groups {
        out.push_str(&underline(&category, '-'));
        out.push('\n');

        for comparison in comparisons {
            let probe = &comparison.probe;
            let metadata = &probe.metadata;

            out.push_str(&format!(".. _divergence_{}:\n\n", probe.id));
            out.push_str(&underline(&metadata.description, '~'));
            out.push('\n');
            out.push_str(&format!("**Cause:** {}\n\n", metadata.cause));
            if !metadata.workaround.is_empty() {
                out.push_str(&format!("**Workaround:** {}\n\n", metadata.workaround));
            }
            out.push_str("Sample code::\n\n");
            out.push_str(&indent(probe.body.as_str(), "    "));
            out.push_str("\n\n");
            out.push_str(&grid_table(
                [
                    report.reference_runtime.as_str(),
                    report.constrained_runtime.as_str(),
                ],
                [
                    comparison.reference.outcome.display_text().as_str(),
                    comparison.constrained.outcome.display_text().as_str(),
                ],
            ));
            out.push('\n');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_table_layout() {
        let table = grid_table(["reference", "constrained"], ["['/a']\n", "/a\n"]);

        assert_eq!(
            table,
            "+-----------+-------------+\n\
             | reference | constrained |\n\
             +===========+=============+\n\
             | ['/a']    | /a          |\n\
             +-----------+-------------+\n"
        );
    }

    #[test]
    fn test_grid_table_multiline() {
        let table = grid_table(["a", "b"], ["1\n2\n", ""]);
        assert_eq!(table.lines().count(), 6);
    }

    #[test]
    fn test_indent_keeps_blank_lines_bare() {
        assert_eq!(indent("import x\n\nprint(x)\n", "    "), "    import x\n\n    print(x)");
    }
}
