//! Per-unit state machine and terminal outcome.

use crate::error::GenerationError;
use crate::fingerprint::compute_group_key;
use crate::grouping::UnitPlan;
use crate::staleness::InvocationReason;
use crate::types::GroupKey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Lifecycle of one unit of work within a run.
///
/// `Pending → Evaluating → {Skipped | Invoking} → {Succeeded | Failed}`.
/// `Evaluating → Failed` covers units whose context cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Pending,
    Evaluating,
    Skipped,
    Invoking,
    Succeeded,
    Failed,
}

impl UnitState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UnitState::Skipped | UnitState::Succeeded | UnitState::Failed
        )
    }

    /// Terminal states that count toward overall success.
    pub fn is_success(&self) -> bool {
        matches!(self, UnitState::Skipped | UnitState::Succeeded)
    }

    pub fn can_transition_to(&self, next: UnitState) -> bool {
        matches!(
            (self, next),
            (UnitState::Pending, UnitState::Evaluating)
                | (UnitState::Evaluating, UnitState::Skipped)
                | (UnitState::Evaluating, UnitState::Invoking)
                | (UnitState::Evaluating, UnitState::Failed)
                | (UnitState::Invoking, UnitState::Succeeded)
                | (UnitState::Invoking, UnitState::Failed)
                | (UnitState::Invoking, UnitState::Skipped)
        )
    }
}

/// Terminal record of one unit of work.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub group_key: GroupKey,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub state: UnitState,
    /// Comparator verdict, once the unit got that far
    pub reason: Option<InvocationReason>,
    pub error: Option<GenerationError>,
    /// A render failure was downgraded to a skip by `ignore_errors`
    pub error_ignored: bool,
    pub elapsed: Duration,
}

impl UnitOutcome {
    pub(crate) fn pending(plan: &UnitPlan) -> Self {
        Self {
            group_key: compute_group_key(&plan.outputs),
            inputs: plan.inputs.clone(),
            outputs: plan.outputs.clone(),
            state: UnitState::Pending,
            reason: None,
            error: None,
            error_ignored: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Move to `next`, recording the transition.
    pub(crate) fn advance(&mut self, next: UnitState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid unit transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(
            group_key = %self.group_key.short(),
            from = ?self.state,
            to = ?next,
            "Unit state transition"
        );
        self.state = next;
    }

    pub(crate) fn fail(&mut self, error: GenerationError) {
        self.error = Some(error);
        self.advance(UnitState::Failed);
    }

    /// Generated outputs this run.
    pub fn regenerated(&self) -> bool {
        self.state == UnitState::Succeeded
    }

    /// Skipped because nothing changed.
    pub fn up_to_date(&self) -> bool {
        self.state == UnitState::Skipped && !self.error_ignored
    }

    /// Never started because the run was cancelled.
    pub fn cancelled(&self) -> bool {
        self.state == UnitState::Pending
    }

    /// Human-readable label: first input plus a count of the rest.
    pub fn label(&self) -> String {
        match self.inputs.as_slice() {
            [] => self
                .outputs
                .first()
                .map(|o| o.display().to_string())
                .unwrap_or_default(),
            [single] => single.display().to_string(),
            [first, rest @ ..] => format!("{} (+{} more)", first.display(), rest.len()),
        }
    }
}
