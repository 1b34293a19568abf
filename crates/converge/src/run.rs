//! The single forward pass: plan, execute, record, in declaration order
//!
//! One resource runs to completion (including retries) before the next
//! begins. Nothing is revisited and nothing runs concurrently - system
//! convergence must not race two mutations of overlapping state.

use crate::context::{ExecContext, Progress};
use crate::error::{Error, Result};
use crate::executor;
use crate::planner::{self, Planned};
use crate::probe::Prober;
use crate::registry::Registry;
use crate::reporter::Ledger;
use crate::types::{ChangeSet, Outcome, OutcomeStatus, ResourceKind, ResourceSpec};

/// Reconcile every spec, in order, against the live facilities in `ctx`
///
/// Fails up front with `UnknownKind` - before any mutation - when a spec
/// names a kind the registry does not know. Resource-level failures are
/// isolated: they produce a Failed outcome and the run continues, unless
/// the spec is marked run-fatal, in which case the run stops after that
/// outcome is recorded.
///
/// With `ctx.dry_run` set, outcomes are predicted from the diff (Changed
/// iff the changeset is non-empty) and no primitive operation is issued;
/// later guards still evaluate against the predicted ledger.
pub fn converge(
    specs: &[ResourceSpec],
    registry: &Registry,
    prober: &dyn Prober,
    ctx: &ExecContext,
    progress: &mut dyn Progress,
) -> Result<Ledger> {
    validate_kinds(specs, registry)?;

    let mut ledger = Ledger::new();
    for spec in specs {
        let name = display_name(spec, registry);
        progress.on_resource_start(&name);

        let outcome = match planner::plan(spec, registry, prober, &ledger) {
            Ok(Planned::Skipped) => Outcome::skipped(&name, spec),
            Ok(Planned::Changes(changes)) => {
                if ctx.dry_run {
                    predicted(&name, spec, &changes)
                } else {
                    executor::execute(&name, spec, &changes, ctx)
                }
            }
            Err(err) => Outcome::failed(&name, spec, err),
        };

        progress.on_resource_complete(&outcome);
        let stop = outcome.status == OutcomeStatus::Failed && spec.run_fatal;
        ledger.record(outcome);
        if stop {
            break;
        }
    }

    Ok(ledger)
}

/// Pre-validate that every declared kind has a handler; a configuration
/// defect aborts the run before anything is probed or mutated
pub fn validate_kinds(specs: &[ResourceSpec], registry: &Registry) -> Result<()> {
    for spec in specs {
        if !registry.knows(spec.kind()) {
            return Err(Error::UnknownKind(spec.kind()));
        }
    }
    Ok(())
}

fn predicted(name: &str, spec: &ResourceSpec, changes: &ChangeSet) -> Outcome {
    if changes.is_empty() {
        Outcome::unchanged(name, spec)
    } else {
        Outcome::changed(name, spec)
    }
}

fn display_name(spec: &ResourceSpec, registry: &Registry) -> String {
    if !spec.name.is_empty() {
        return spec.name.clone();
    }
    registry
        .lookup(spec.kind())
        .map(|h| h.describe(&spec.id))
        .unwrap_or_else(|_| format!("{} '{}'", spec.kind(), spec.id))
}

/// One planned resource, for diff display before an apply
#[derive(Debug)]
pub struct PlannedResource {
    pub name: String,
    pub kind: ResourceKind,
    pub id: String,
    pub elevated: bool,
    pub action: PlannedAction,
}

/// What a resource would do if applied now
#[derive(Debug)]
pub enum PlannedAction {
    Skip,
    NoChange,
    Apply(ChangeSet),
    /// Planning itself failed (probe error, dangling guard)
    Blocked { reason: String },
}

/// Plan every resource without mutating anything, for `plan`-style display
///
/// Guards evaluate against predicted outcomes, exactly as a dry run would
/// record them.
pub fn preview(
    specs: &[ResourceSpec],
    registry: &Registry,
    prober: &dyn Prober,
) -> Result<Vec<PlannedResource>> {
    validate_kinds(specs, registry)?;

    let mut ledger = Ledger::new();
    let mut planned = Vec::with_capacity(specs.len());
    for spec in specs {
        let name = display_name(spec, registry);
        let (action, outcome) = match planner::plan(spec, registry, prober, &ledger) {
            Ok(Planned::Skipped) => (PlannedAction::Skip, Outcome::skipped(&name, spec)),
            Ok(Planned::Changes(changes)) => {
                let outcome = predicted(&name, spec, &changes);
                let action = if changes.is_empty() {
                    PlannedAction::NoChange
                } else {
                    PlannedAction::Apply(changes)
                };
                (action, outcome)
            }
            Err(err) => {
                let outcome = Outcome::failed(&name, spec, &err);
                (
                    PlannedAction::Blocked {
                        reason: err.to_string(),
                    },
                    outcome,
                )
            }
        };

        let blocked = matches!(action, PlannedAction::Blocked { .. });
        ledger.record(outcome);
        planned.push(PlannedResource {
            name,
            kind: spec.kind(),
            id: spec.id.clone(),
            elevated: spec.exec.elevate,
            action,
        });

        if blocked && spec.run_fatal {
            break;
        }
    }

    Ok(planned)
}
