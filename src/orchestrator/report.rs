//! Run aggregation: counts, overall result, and a serializable summary.

use crate::grouping::GroupingPolicy;
use crate::orchestrator::unit::{UnitOutcome, UnitState};
use serde::Serialize;
use std::time::Duration;

/// Result of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub generator: String,
    pub policy: GroupingPolicy,
    /// One outcome per planned unit, in plan order
    pub outcomes: Vec<UnitOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    /// True only if every unit ended `Succeeded` or `Skipped`.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.state.is_success())
    }

    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn generated(&self) -> usize {
        self.outcomes.iter().filter(|o| o.regenerated()).count()
    }

    pub fn up_to_date(&self) -> usize {
        self.outcomes.iter().filter(|o| o.up_to_date()).count()
    }

    pub fn failed(&self) -> usize {
        self.count_state(UnitState::Failed)
    }

    pub fn ignored(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error_ignored).count()
    }

    pub fn cancelled(&self) -> usize {
        self.outcomes.iter().filter(|o| o.cancelled()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == UnitState::Failed)
    }

    fn count_state(&self, state: UnitState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            generator: self.generator.clone(),
            policy: self.policy,
            success: self.is_success(),
            total: self.outcomes.len(),
            generated: self.generated(),
            up_to_date: self.up_to_date(),
            failed: self.failed(),
            ignored: self.ignored(),
            cancelled: self.cancelled(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            units: self
                .outcomes
                .iter()
                .map(|o| UnitSummary {
                    group_key: o.group_key.to_string(),
                    inputs: o.inputs.iter().map(|p| p.display().to_string()).collect(),
                    outputs: o.outputs.iter().map(|p| p.display().to_string()).collect(),
                    state: o.state,
                    reason: o.reason.map(|r| r.as_str().to_string()),
                    error_kind: o.error.as_ref().map(|e| e.kind().to_string()),
                    error: o.error.as_ref().map(|e| e.to_string()),
                    error_ignored: o.error_ignored,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generator: String,
    pub policy: GroupingPolicy,
    pub success: bool,
    pub total: usize,
    pub generated: usize,
    pub up_to_date: usize,
    pub failed: usize,
    pub ignored: usize,
    pub cancelled: usize,
    pub elapsed_ms: u64,
    pub units: Vec<UnitSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub group_key: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub state: UnitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub error_ignored: bool,
}
