//! Planner - guard evaluation, probe, diff, in that order
//!
//! Resources are planned strictly in declaration order because a guard
//! may read any earlier resource's outcome; there is no dependency graph
//! beyond that linear forward reference.

use crate::error::{Error, Result};
use crate::probe::Prober;
use crate::registry::Registry;
use crate::reporter::Ledger;
use crate::types::{ChangeSet, Guard, GuardTarget, Outcome, ResourceSpec};

/// Result of planning one resource
#[derive(Debug, PartialEq)]
pub enum Planned {
    /// The guard held the resource back; no probe, no diff, and the
    /// outcome is Skipped rather than Unchanged (skipped resources are
    /// never retried or alerted on)
    Skipped,
    /// Operations that would converge the resource; empty means unchanged
    Changes(ChangeSet),
}

/// Plan a single resource against the outcome ledger so far
pub fn plan(
    spec: &ResourceSpec,
    registry: &Registry,
    prober: &dyn Prober,
    ledger: &Ledger,
) -> Result<Planned> {
    if let Some(guard) = &spec.guard {
        let prior = lookup_guard_target(guard, ledger).ok_or_else(|| Error::Guard {
            resource: if spec.name.is_empty() {
                spec.id.clone()
            } else {
                spec.name.clone()
            },
            reference: guard.target.to_string(),
        })?;
        if prior.status != guard.status {
            return Ok(Planned::Skipped);
        }
    }

    let observed = prober.probe(spec.kind(), &spec.id)?;
    let handler = registry.lookup(spec.kind())?;
    let changes = handler.diff(&spec.id, &spec.desired, &observed)?;
    Ok(Planned::Changes(changes))
}

fn lookup_guard_target<'a>(guard: &Guard, ledger: &'a Ledger) -> Option<&'a Outcome> {
    match &guard.target {
        GuardTarget::Name { resource } => ledger.query_by_name(resource),
        GuardTarget::Identity { kind, id } => ledger.query(*kind, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SpyProber;
    use crate::types::{Desired, Observed, OutcomeStatus, ResourceKind};

    fn sentinel_spec(id: &str) -> ResourceSpec {
        ResourceSpec::new(
            id,
            Desired::ShellCommand {
                commands: vec!["echo run".to_string()],
                retryable: false,
            },
        )
    }

    #[test]
    fn guard_false_skips_without_probing() {
        let registry = Registry::builtin();
        let prober = SpyProber::new();
        let mut ledger = Ledger::new();
        ledger.record(Outcome::unchanged("seed", &sentinel_spec("seed")));

        let spec = sentinel_spec("gated").guarded(Guard::if_changed("seed"));
        let planned = plan(&spec, &registry, &prober, &ledger).unwrap();

        assert_eq!(planned, Planned::Skipped);
        assert!(prober.calls().is_empty(), "guard short-circuit must not probe");
    }

    #[test]
    fn guard_true_probes_and_diffs() {
        let registry = Registry::builtin();
        let prober = SpyProber::new().with(ResourceKind::ShellCommand, "gated", Observed::Absent);
        let mut ledger = Ledger::new();
        ledger.record(Outcome::changed("seed", &sentinel_spec("seed")));

        let spec = sentinel_spec("gated").guarded(Guard::if_changed("seed"));
        match plan(&spec, &registry, &prober, &ledger).unwrap() {
            Planned::Changes(changes) => assert_eq!(changes.len(), 1),
            Planned::Skipped => panic!("guard held despite matching status"),
        }
        assert_eq!(prober.calls(), vec![(ResourceKind::ShellCommand, "gated".to_string())]);
    }

    #[test]
    fn guard_on_undeclared_resource_is_an_error() {
        let registry = Registry::builtin();
        let prober = SpyProber::new();
        let ledger = Ledger::new();

        let spec = sentinel_spec("gated")
            .named("gated step")
            .guarded(Guard::if_failed("never declared"));
        let err = plan(&spec, &registry, &prober, &ledger).unwrap_err();
        assert!(matches!(err, Error::Guard { .. }));
        assert!(prober.calls().is_empty());
    }

    #[test]
    fn guard_by_identity_reads_the_ledger() {
        let registry = Registry::builtin();
        let prober = SpyProber::new().with(ResourceKind::ShellCommand, "gated", Observed::Present);
        let mut ledger = Ledger::new();
        ledger.record(Outcome::failed("docker unit", &sentinel_spec("docker"), "boom"));

        let spec = sentinel_spec("gated").guarded(Guard {
            target: GuardTarget::Identity {
                kind: ResourceKind::ShellCommand,
                id: "docker".to_string(),
            },
            status: OutcomeStatus::Failed,
        });
        // Sentinel already present: planned but converged
        match plan(&spec, &registry, &prober, &ledger).unwrap() {
            Planned::Changes(changes) => assert!(changes.is_empty()),
            Planned::Skipped => panic!("matching guard must not skip"),
        }
    }
}
