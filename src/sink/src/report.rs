// Copyright 2024 The Tablewave Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Human-readable run report (spec.md §6: `export_report_<ts>.txt`).
//! Supplements the distilled spec with a structured [`RunSummary`] type
//! (SPEC_FULL §3) rendered with `comfy-table`, the same tabular-text
//! approach the teacher's CLI summaries use.

use std::path::Path;

use comfy_table::{presets::ASCII_FULL, Table};
use tablewave_common::model::{ExportWarning, RunSummary};

/// Renders `export_report_<ts>.txt`: start/end timestamps, duration,
/// totals, and per-table row counts sorted descending.
pub fn render_report(summary: &RunSummary, started_at: &str, finished_at: &str) -> String {
    let mut out = String::new();
    out.push_str("tablewave export report\n");
    out.push_str("========================\n");
    out.push_str(&format!("database:    {}\n", summary.database_name));
    out.push_str(&format!("schema:      {}\n", summary.schema_name));
    out.push_str(&format!("started:     {started_at}\n"));
    out.push_str(&format!("finished:    {finished_at}\n"));
    out.push_str(&format!(
        "duration:    {:.2}s\n",
        summary.total_duration().as_secs_f64()
    ));
    out.push_str(&format!("tables:      {}\n", summary.table_count));
    out.push_str(&format!("total rows:  {}\n", summary.total_rows()));
    out.push('\n');

    if !summary.phase_durations.is_empty() {
        let mut phase_table = Table::new();
        phase_table.load_preset(ASCII_FULL).set_header(vec!["phase", "duration (s)"]);
        for (phase, duration) in &summary.phase_durations {
            phase_table.add_row(vec![phase.clone(), format!("{:.2}", duration.as_secs_f64())]);
        }
        out.push_str(&phase_table.to_string());
        out.push_str("\n\n");
    }

    let mut rows = summary.results.clone();
    rows.sort_by(|a, b| b.row_count.cmp(&a.row_count));
    let mut row_table = Table::new();
    row_table.load_preset(ASCII_FULL).set_header(vec!["table", "rows", "duration (s)"]);
    for r in &rows {
        row_table.add_row(vec![
            r.table_name.clone(),
            r.row_count.to_string(),
            format!("{:.2}", r.duration.as_secs_f64()),
        ]);
    }
    out.push_str(&row_table.to_string());
    out.push_str("\n\n");

    if !summary.warnings.is_empty() {
        out.push_str("warnings\n--------\n");
        for warning in &summary.warnings {
            out.push_str(&format!("{}\n", describe_warning(warning)));
        }
    }

    out
}

fn describe_warning(warning: &ExportWarning) -> String {
    match warning {
        ExportWarning::Cycle(table) => {
            format!("`{table}` participates in a foreign-key cycle; exported in the final wave")
        }
        ExportWarning::NoPrimaryKey(table) => format!("`{table}` has no primary key"),
        ExportWarning::NoSortStrategy(table) => {
            format!("`{table}` has no usable sort column; rows exported in server order")
        }
    }
}

/// Writes the rendered report to `export_report_<ts>.txt` under
/// `output_directory`.
pub async fn write_report(
    output_directory: &Path,
    timestamp: &str,
    summary: &RunSummary,
    started_at: &str,
    finished_at: &str,
) -> std::io::Result<()> {
    let path = output_directory.join(format!("export_report_{timestamp}.txt"));
    let contents = render_report(summary, started_at, finished_at);
    tokio::fs::write(path, contents).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tablewave_common::model::ExportResult;

    #[test]
    fn zero_tables_has_no_division_by_zero() {
        // spec.md §8 boundary scenario 6
        let summary = RunSummary::new("Empty", "dbo", 10);
        let report = render_report(&summary, "2026-07-30T09:00:00Z", "2026-07-30T09:00:01Z");
        assert!(report.contains("tables:      0"));
        assert!(report.contains("total rows:  0"));
    }

    #[test]
    fn rows_sorted_descending() {
        let mut summary = RunSummary::new("Northwind", "dbo", 10);
        summary.table_count = 2;
        summary.results = vec![
            ExportResult { table_name: "small".into(), row_count: 3, duration: Duration::from_secs(1) },
            ExportResult { table_name: "big".into(), row_count: 900, duration: Duration::from_secs(2) },
        ];
        let report = render_report(&summary, "start", "end");
        let big_pos = report.find("big").unwrap();
        let small_pos = report.find("small").unwrap();
        assert!(big_pos < small_pos);
    }

    #[test]
    fn warnings_section_lists_cycle_tables() {
        let mut summary = RunSummary::new("Northwind", "dbo", 10);
        summary.warnings.push(ExportWarning::Cycle("x".into()));
        let report = render_report(&summary, "start", "end");
        assert!(report.contains("`x` participates in a foreign-key cycle"));
    }
}
