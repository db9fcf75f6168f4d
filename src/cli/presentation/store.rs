//! Store presentation: status table and clean results.

use crate::cleaner::CleanReport;
use crate::cli::output::to_json;
use crate::error::ApiError;
use comfy_table::Table;
use serde::Serialize;

/// One recorded group as shown by `kiln status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusRow {
    pub group_key: String,
    pub inputs: usize,
    pub outputs: Vec<String>,
    /// Recorded outputs still present on disk
    pub outputs_present: bool,
    pub recorded_at: Option<String>,
    pub corrupt: bool,
}

pub fn format_status_text(rows: &[StatusRow]) -> String {
    if rows.is_empty() {
        return "No recorded output groups.".to_string();
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Group", "Outputs", "Inputs", "Recorded At", "State"]);
    for row in rows {
        let short = &row.group_key[..row.group_key.len().min(12)];
        let outputs = match row.outputs.as_slice() {
            [] => "-".to_string(),
            [single] => single.clone(),
            [first, rest @ ..] => format!("{} (+{} more)", first, rest.len()),
        };
        let state = if row.corrupt {
            "corrupt"
        } else if row.outputs_present {
            "recorded"
        } else {
            "outputs missing"
        };
        table.add_row(vec![
            short.to_string(),
            outputs,
            row.inputs.to_string(),
            row.recorded_at.clone().unwrap_or_else(|| "-".to_string()),
            state.to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_status_json(rows: &[StatusRow]) -> Result<String, ApiError> {
    to_json(&rows)
}

pub fn format_clean_text(report: &CleanReport) -> String {
    if report.is_empty() {
        return "Nothing to clean.".to_string();
    }
    let mut lines: Vec<String> = report
        .removed_outputs
        .iter()
        .chain(report.removed_locations.iter())
        .map(|p| format!("  removed {}", p.display()))
        .collect();
    lines.push(format!(
        "Cleaned {} group(s), {} file(s)",
        report.removed_entries.len(),
        report.removed_outputs.len() + report.removed_locations.len()
    ));
    if report.dropped_corrupt > 0 {
        lines.push(format!(
            "Dropped {} corrupt record(s)",
            report.dropped_corrupt
        ));
    }
    lines.join("\n")
}

pub fn format_clean_json(report: &CleanReport) -> Result<String, ApiError> {
    to_json(report)
}
