//! Invocation Orchestrator
//!
//! Plans units per the generator's grouping policy, decides per unit whether
//! the generator must run, invokes it at most once per unit, commits outputs
//! and records the new context. Per-item units are independent: one unit's
//! failure never blocks its siblings.

pub mod report;
pub mod unit;

pub use report::{RunReport, RunSummary, UnitSummary};
pub use unit::{UnitOutcome, UnitState};

use crate::context::{InvocationContext, Metadata, RawMetadata};
use crate::error::{ApiError, GenerationError};
use crate::generator::Generator;
use crate::grouping::{plan_units, GroupingPolicy, OutputNaming, UnitPlan};
use crate::output::{all_outputs_exist, StagedOutputs};
use crate::staleness::compare;
use crate::store::ContextStore;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Caller-level switches for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationOptions {
    /// Regenerate every unit regardless of staleness
    pub force: bool,
    /// Downgrade render failures to logged skips
    pub ignore_errors: bool,
    /// Run per-item units on a rayon pool
    pub parallel: bool,
    /// Pool size when parallel; 0 uses rayon's global pool
    pub max_threads: usize,
}

impl Default for InvocationOptions {
    fn default() -> Self {
        Self {
            force: false,
            ignore_errors: false,
            parallel: true,
            max_threads: 0,
        }
    }
}

/// Shared flag checked before each unit starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What to generate: declared inputs, where outputs go, and generator metadata.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub inputs: Vec<PathBuf>,
    pub naming: OutputNaming,
    pub metadata: RawMetadata,
}

pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    store: Arc<dyn ContextStore>,
    options: InvocationOptions,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn Generator>, store: Arc<dyn ContextStore>) -> Self {
        Self {
            generator,
            store,
            options: InvocationOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: InvocationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &InvocationOptions {
        &self.options
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Execute one run.
    ///
    /// `Err` is reserved for problems that abort the run before any unit
    /// starts (unserializable metadata, planning errors, pool setup). Unit
    /// failures are reported in the returned `RunReport`.
    pub fn run(&self, request: &InvocationRequest) -> Result<RunReport, ApiError> {
        let started = Instant::now();
        let metadata = Metadata::from_raw(&request.metadata)?;
        let policy = self.generator.grouping_policy();
        let plans = plan_units(&request.inputs, policy, &request.naming)?;

        info!(
            generator = self.generator.name(),
            policy = ?policy,
            units = plans.len(),
            force = self.options.force,
            "Starting generation run"
        );

        let outcomes = self.execute_all(&plans, &metadata, policy)?;

        let report = RunReport {
            generator: self.generator.name().to_string(),
            policy,
            outcomes,
            elapsed: started.elapsed(),
        };
        info!(
            generated = report.generated(),
            up_to_date = report.up_to_date(),
            failed = report.failed(),
            ignored = report.ignored(),
            cancelled = report.cancelled(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Generation run finished"
        );
        Ok(report)
    }

    fn execute_all(
        &self,
        plans: &[UnitPlan],
        metadata: &Metadata,
        policy: GroupingPolicy,
    ) -> Result<Vec<UnitOutcome>, ApiError> {
        let parallel = self.options.parallel && policy == GroupingPolicy::PerItem && plans.len() > 1;
        if !parallel {
            return Ok(plans
                .iter()
                .map(|plan| self.execute_unit(plan, metadata))
                .collect());
        }

        // collect() on an indexed parallel iterator keeps plan order
        let run = || {
            plans
                .par_iter()
                .map(|plan| self.execute_unit(plan, metadata))
                .collect::<Vec<_>>()
        };
        if self.options.max_threads == 0 {
            return Ok(run());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_threads)
            .build()
            .map_err(|e| ApiError::InvalidInput(format!("Failed to build worker pool: {}", e)))?;
        Ok(pool.install(run))
    }

    /// Drive one unit through its state machine.
    fn execute_unit(&self, plan: &UnitPlan, metadata: &Metadata) -> UnitOutcome {
        let mut outcome = UnitOutcome::pending(plan);
        if self.cancel.is_cancelled() {
            debug!(unit = %outcome.label(), "Run cancelled, unit not started");
            return outcome;
        }

        let started = Instant::now();
        outcome.advance(UnitState::Evaluating);
        self.evaluate_and_invoke(&mut outcome, plan, metadata);
        outcome.elapsed = started.elapsed();

        if outcome.state == UnitState::Failed {
            if let Some(err) = &outcome.error {
                error!(
                    unit = %outcome.label(),
                    group_key = %outcome.group_key.short(),
                    error = %err,
                    "Unit failed"
                );
            }
        }
        outcome
    }

    fn evaluate_and_invoke(&self, outcome: &mut UnitOutcome, plan: &UnitPlan, metadata: &Metadata) {
        let fresh = match InvocationContext::with_metadata(
            plan.inputs.clone(),
            plan.outputs.clone(),
            metadata.clone(),
        ) {
            Ok(context) => context,
            Err(e) => {
                outcome.fail(e);
                return;
            }
        };

        let persisted = self.load_persisted(&fresh);
        let reason = compare(
            &fresh,
            persisted.as_ref(),
            self.options.force,
            self.generator.comparator(),
        );
        outcome.reason = Some(reason);

        if !reason.requires_invocation() {
            info!(unit = %outcome.label(), "Up to date, skipping");
            outcome.advance(UnitState::Skipped);
            return;
        }

        info!(unit = %outcome.label(), reason = %reason, "Regenerating");
        outcome.advance(UnitState::Invoking);

        let contents = match self.generator.render(&fresh) {
            Ok(contents) => contents,
            Err(e) => {
                let input = e
                    .input
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| fresh.label());
                let failure = GenerationError::RenderFailure {
                    input,
                    message: e.message,
                };
                if self.options.ignore_errors {
                    warn!(unit = %outcome.label(), error = %failure, "Ignoring render failure");
                    outcome.error = Some(failure);
                    outcome.error_ignored = true;
                    outcome.advance(UnitState::Skipped);
                } else {
                    outcome.fail(failure);
                }
                return;
            }
        };

        if let Err(e) = StagedOutputs::stage(fresh.outputs(), contents).and_then(StagedOutputs::commit) {
            outcome.fail(e);
            return;
        }

        if let Err(e) = self.store.save(fresh.group_key(), &fresh) {
            outcome.fail(GenerationError::StoreWriteFailure {
                group_key: fresh.group_key().clone(),
                message: e.to_string(),
            });
            return;
        }

        outcome.advance(UnitState::Succeeded);
    }

    /// The persisted context for `fresh`, if it still describes outputs on disk.
    ///
    /// Backend errors read as a miss. An entry whose outputs have gone missing
    /// is dropped so the group is regenerated as new.
    fn load_persisted(&self, fresh: &InvocationContext) -> Option<InvocationContext> {
        let key = fresh.group_key();
        let persisted = match self.store.load(key) {
            Ok(persisted) => persisted?,
            Err(e) => {
                warn!(group_key = %key.short(), error = %e, "Context store read failed, treating as miss");
                return None;
            }
        };

        if all_outputs_exist(persisted.outputs()) {
            return Some(persisted);
        }

        debug!(group_key = %key.short(), "Recorded output missing, dropping stored context");
        if let Err(e) = self.store.delete(key) {
            warn!(group_key = %key.short(), error = %e, "Failed to drop stale context entry");
        }
        None
    }
}
