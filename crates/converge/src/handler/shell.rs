//! Shell command handler - raw commands with an optional creates-sentinel
//!
//! An absolute-path identity doubles as a sentinel: once that path
//! exists the resource is converged and the commands never run again.
//! Any other identity has no observable state, so the commands run on
//! every pass (a deliberately non-idempotent escape hatch).

use super::mismatch;
use crate::error::Result;
use crate::registry::Handler;
use crate::types::{ChangeSet, Desired, Observed, Op, ResourceKind};

pub struct ShellHandler;

impl Handler for ShellHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ShellCommand
    }

    fn describe(&self, id: &str) -> String {
        format!("Shell commands '{id}'")
    }

    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet> {
        let (commands, retryable) = match desired {
            Desired::ShellCommand {
                commands,
                retryable,
            } => (commands, *retryable),
            other => return Err(mismatch(id, "shell_command attributes", other)),
        };

        match observed {
            Observed::Present => Ok(Vec::new()),
            Observed::Absent => Ok(commands
                .iter()
                .map(|script| Op::Shell {
                    script: script.clone(),
                    env: Vec::new(),
                    retryable,
                })
                .collect()),
            other => Err(mismatch(id, "a sentinel observation", other)),
        }
    }
}
