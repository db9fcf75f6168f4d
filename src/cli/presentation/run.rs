//! Run presentation: generation summaries and template variable listings.

use crate::cli::output::to_json;
use crate::error::ApiError;
use crate::orchestrator::{RunReport, UnitOutcome, UnitState};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;

fn status_word(outcome: &UnitOutcome) -> &'static str {
    match outcome.state {
        UnitState::Succeeded => "generated",
        UnitState::Skipped if outcome.error_ignored => "ignored",
        UnitState::Skipped => "up-to-date",
        UnitState::Failed => "failed",
        UnitState::Pending => "cancelled",
        // Never terminal in a finished report
        UnitState::Evaluating | UnitState::Invoking => "interrupted",
    }
}

fn paint(word: &str, color: bool) -> String {
    let padded = format!("{:<10}", word);
    if !color {
        return padded;
    }
    match word {
        "generated" => padded.green().to_string(),
        "up-to-date" => padded.dimmed().to_string(),
        "failed" => padded.red().bold().to_string(),
        "ignored" => padded.yellow().to_string(),
        _ => padded.magenta().to_string(),
    }
}

pub fn format_run_text(report: &RunReport, color: bool) -> String {
    let mut lines = Vec::with_capacity(report.outcomes.len() + 2);
    for outcome in &report.outcomes {
        let word = status_word(outcome);
        let mut line = format!("  {} {}", paint(word, color), outcome.label());
        if let Some(output) = outcome.outputs.first() {
            line.push_str(&format!(" -> {}", output.display()));
            if outcome.outputs.len() > 1 {
                line.push_str(&format!(" (+{} more)", outcome.outputs.len() - 1));
            }
        }
        if outcome.state == UnitState::Succeeded {
            if let Some(reason) = outcome.reason {
                line.push_str(&format!(" [{}]", reason));
            }
        }
        if let Some(err) = &outcome.error {
            line.push_str(&format!("\n      {}: {}", err.kind(), err));
        }
        lines.push(line);
    }

    let summary = format!(
        "{} unit(s): {} generated, {} up-to-date, {} failed, {} ignored, {} cancelled ({} ms)",
        report.outcomes.len(),
        report.generated(),
        report.up_to_date(),
        report.failed(),
        report.ignored(),
        report.cancelled(),
        report.elapsed.as_millis()
    );
    lines.push(String::new());
    if color && !report.is_success() {
        lines.push(summary.red().to_string());
    } else {
        lines.push(summary);
    }
    lines.join("\n")
}

pub fn format_run_json(report: &RunReport) -> Result<String, ApiError> {
    to_json(&report.summary())
}

/// Variables referenced by one template.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateVars {
    pub path: PathBuf,
    pub variables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn format_vars_text(entries: &[TemplateVars]) -> String {
    entries
        .iter()
        .map(|entry| match &entry.error {
            Some(err) => format!("{}: error: {}", entry.path.display(), err),
            None if entry.variables.is_empty() => format!("{}: (none)", entry.path.display()),
            None => format!("{}: {}", entry.path.display(), entry.variables.join(", ")),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_vars_json(entries: &[TemplateVars]) -> Result<String, ApiError> {
    to_json(&entries)
}
