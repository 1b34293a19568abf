//! Outcome ledger - append-only record of a run, queryable by later guards

use crate::types::{Outcome, OutcomeStatus, ResourceKind};

/// Ordered, append-only record of every resource's outcome in one run
///
/// Guards read earlier outcomes through `query`/`query_by_name`; both
/// return the most recent match, so a duplicated (kind, identity) sees
/// its predecessor's outcome.
#[derive(Debug, Default)]
pub struct Ledger {
    outcomes: Vec<Outcome>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        match &outcome.error {
            Some(error) => log::warn!(
                "outcome name={:?} kind={} id={:?} status={} error={:?}",
                outcome.name,
                outcome.kind,
                outcome.id,
                outcome.status,
                error
            ),
            None => log::info!(
                "outcome name={:?} kind={} id={:?} status={}",
                outcome.name,
                outcome.kind,
                outcome.id,
                outcome.status
            ),
        }
        self.outcomes.push(outcome);
    }

    pub fn query(&self, kind: ResourceKind, id: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .rev()
            .find(|o| o.kind == kind && o.id == id)
    }

    pub fn query_by_name(&self, name: &str) -> Option<&Outcome> {
        self.outcomes.iter().rev().find(|o| o.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True unless some non-best-effort resource failed; drives the
    /// process exit code
    pub fn is_success(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|o| o.status == OutcomeStatus::Failed && !o.best_effort)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for outcome in &self.outcomes {
            match outcome.status {
                OutcomeStatus::Unchanged => summary.unchanged += 1,
                OutcomeStatus::Changed => summary.changed += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
                OutcomeStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

/// Per-status counts over a ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub unchanged: usize,
    pub changed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.unchanged + self.changed + self.skipped + self.failed
    }
}
