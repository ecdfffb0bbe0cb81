//! `autodoc`: Markdown summary rendered from the compiled results CSV.
use super::csv::Table;
use crate::paths::PipelinePaths;
use crate::util::write_atomic;
use anyhow::{anyhow, Result};
use std::fmt::Write as _;

/// Score columns averaged in the summary, with their display labels.
const SCORE_COLUMNS: [(&str, &str); 4] = [
    ("performance", "Performance"),
    ("seo", "SEO"),
    ("best_practices", "Best practices"),
    ("accessibility", "Accessibility"),
];

/// Vitals shown per domain but not averaged.
const VITAL_COLUMNS: [(&str, &str); 3] = [
    ("lcp_ms", "LCP (ms)"),
    ("cls", "CLS"),
    ("inp_ms", "INP (ms)"),
];

const MISSING: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
struct ResultRow {
    domain: String,
    scores: [Option<f64>; 4],
    vitals: [String; 3],
}

impl ResultRow {
    fn has_numeric_score(&self) -> bool {
        self.scores.iter().any(Option::is_some)
    }
}

/// Render `outputs/reports/summary.md` from `outputs/csv/results.csv`.
pub fn autodoc(paths: &PipelinePaths, run_id: &str) -> Result<String> {
    let table = Table::read(&paths.summary_csv_path())?;
    let rows = result_rows(&table)?;
    let markdown = render_summary(run_id, &rows);
    let report = paths.report_path();
    write_atomic(&report, markdown.as_bytes())?;
    let numeric = rows.iter().filter(|row| row.has_numeric_score()).count();
    Ok(format!(
        "{} rows summarized ({numeric} with scores) in {}",
        rows.len(),
        paths.rel_path(&report)
    ))
}

fn result_rows(table: &Table) -> Result<Vec<ResultRow>> {
    let domain = table
        .column(&["domain"])
        .ok_or_else(|| anyhow!("results CSV has no domain column"))?;
    let score_index = SCORE_COLUMNS.map(|(name, _)| table.column(&[name]));
    let vital_index = VITAL_COLUMNS.map(|(name, _)| table.column(&[name]));

    let mut rows = Vec::new();
    for row in &table.rows {
        let domain = table.cell(row, domain);
        // The compiler writes one blank row when nothing was audited.
        if domain.is_empty() {
            continue;
        }
        rows.push(ResultRow {
            domain: domain.to_string(),
            scores: score_index
                .map(|index| index.and_then(|i| parse_number(table.cell(row, i)))),
            vitals: vital_index.map(|index| {
                index
                    .map(|i| table.cell(row, i))
                    .filter(|value| !value.is_empty())
                    .unwrap_or(MISSING)
                    .to_string()
            }),
        });
    }
    Ok(rows)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn average(rows: &[ResultRow], column: usize) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|row| row.scores[column]).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn format_score(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.1}"),
        None => MISSING.to_string(),
    }
}

fn render_summary(run_id: &str, rows: &[ResultRow]) -> String {
    let numeric = rows.iter().filter(|row| row.has_numeric_score()).count();
    let mut out = String::new();
    let _ = writeln!(out, "# Website audit summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "Run: `{run_id}`");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Audited rows: {}", rows.len());
    let _ = writeln!(out, "- Rows with numeric scores: {numeric}");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Metric | Average |");
    let _ = writeln!(out, "| --- | --- |");
    for (index, (_, label)) in SCORE_COLUMNS.iter().enumerate() {
        let _ = writeln!(out, "| {label} | {} |", format_score(average(rows, index)));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "## Per-domain results");
    let _ = writeln!(out);
    if rows.is_empty() {
        let _ = writeln!(out, "No domains were audited.");
        return out;
    }
    let labels: Vec<&str> = SCORE_COLUMNS
        .iter()
        .chain(VITAL_COLUMNS.iter())
        .map(|(_, label)| *label)
        .collect();
    let _ = writeln!(out, "| Domain | {} |", labels.join(" | "));
    let _ = writeln!(out, "| --- |{}", " --- |".repeat(labels.len()));
    for row in rows {
        let mut cells: Vec<String> =
            row.scores.iter().map(|score| format_score(*score)).collect();
        cells.extend(row.vitals.iter().cloned());
        let _ = writeln!(out, "| {} | {} |", row.domain, cells.join(" | "));
    }
    out
}
