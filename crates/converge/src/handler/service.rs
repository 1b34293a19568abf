//! Service handler - systemd unit enablement and activity
//!
//! The identity is the unit name. `enabled`/`running` set to false mean
//! "don't care", not "disable": the handler only moves units toward the
//! states the spec asks for.

use super::mismatch;
use crate::error::Result;
use crate::probe::sh_quote;
use crate::registry::Handler;
use crate::types::{ChangeSet, Desired, Observed, Op, ResourceKind};

pub struct ServiceHandler;

impl Handler for ServiceHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    fn describe(&self, id: &str) -> String {
        format!("Service '{id}'")
    }

    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet> {
        let (want_enabled, want_running) = match desired {
            Desired::Service { enabled, running } => (*enabled, *running),
            other => return Err(mismatch(id, "service attributes", other)),
        };

        // An unknown unit plans both ops and fails at apply time with
        // systemctl's own error, which names the unit.
        let (enabled, active) = match observed {
            Observed::Unit { enabled, active } => (*enabled, *active),
            Observed::Absent => (false, false),
            other => return Err(mismatch(id, "a unit observation", other)),
        };

        let unit = sh_quote(id);
        let mut ops = Vec::new();
        if want_enabled && !enabled {
            ops.push(Op::shell(format!("systemctl enable {unit}")));
        }
        if want_running && !active {
            ops.push(Op::shell(format!("systemctl start {unit}")));
        }
        Ok(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desired(enabled: bool, running: bool) -> Desired {
        Desired::Service { enabled, running }
    }

    #[test]
    fn disabled_inactive_unit_gets_both_ops() {
        let changes = ServiceHandler
            .diff(
                "docker",
                &desired(true, true),
                &Observed::Unit {
                    enabled: false,
                    active: false,
                },
            )
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Op::Shell { script, .. } if script == "systemctl enable 'docker'"));
        assert!(matches!(&changes[1], Op::Shell { script, .. } if script == "systemctl start 'docker'"));
    }

    #[test]
    fn running_enabled_unit_is_converged() {
        let changes = ServiceHandler
            .diff(
                "docker",
                &desired(true, true),
                &Observed::Unit {
                    enabled: true,
                    active: true,
                },
            )
            .unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn false_means_dont_care() {
        let changes = ServiceHandler
            .diff(
                "docker",
                &desired(false, true),
                &Observed::Unit {
                    enabled: false,
                    active: true,
                },
            )
            .unwrap();
        assert!(changes.is_empty());
    }
}
