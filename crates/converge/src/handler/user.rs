//! User account handler - creation, login shell and group membership
//!
//! The identity is the username. Convergence is additive: groups are
//! joined, never left.

use super::mismatch;
use crate::error::Result;
use crate::probe::sh_quote;
use crate::registry::Handler;
use crate::types::{ChangeSet, Desired, Observed, Op, ResourceKind};

pub struct UserHandler;

impl Handler for UserHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::User
    }

    fn describe(&self, id: &str) -> String {
        format!("User account '{id}'")
    }

    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet> {
        let (create_home, shell, groups) = match desired {
            Desired::User {
                create_home,
                shell,
                groups,
            } => (*create_home, shell.as_deref(), groups),
            other => return Err(mismatch(id, "user attributes", other)),
        };
        let user = sh_quote(id);

        let mut ops = Vec::new();
        match observed {
            Observed::Absent => {
                let mut cmd = String::from("useradd");
                if create_home {
                    cmd.push_str(" --create-home");
                }
                if let Some(shell) = shell {
                    cmd.push_str(&format!(" --shell {}", sh_quote(shell)));
                }
                cmd.push(' ');
                cmd.push_str(&user);
                ops.push(Op::shell(cmd));

                if !groups.is_empty() {
                    ops.push(join_groups(&user, groups.iter().map(String::as_str)));
                }
            }
            Observed::Account {
                shell: current_shell,
                groups: current_groups,
            } => {
                if let Some(want) = shell
                    && current_shell.as_deref() != Some(want)
                {
                    ops.push(Op::shell(format!(
                        "usermod --shell {} {user}",
                        sh_quote(want)
                    )));
                }

                let missing: Vec<&str> = groups
                    .iter()
                    .map(String::as_str)
                    .filter(|g| !current_groups.contains(*g))
                    .collect();
                if !missing.is_empty() {
                    ops.push(join_groups(&user, missing.into_iter()));
                }
            }
            other => return Err(mismatch(id, "an account observation", other)),
        }

        Ok(ops)
    }
}

fn join_groups<'a>(user: &str, groups: impl Iterator<Item = &'a str>) -> Op {
    let list = groups.collect::<Vec<_>>().join(",");
    Op::shell(format!("usermod -aG {} {user}", sh_quote(&list)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn desired(shell: Option<&str>, groups: &[&str]) -> Desired {
        Desired::User {
            create_home: true,
            shell: shell.map(ToString::to_string),
            groups: groups.iter().map(ToString::to_string).collect(),
        }
    }

    fn account(shell: &str, groups: &[&str]) -> Observed {
        Observed::Account {
            shell: Some(shell.to_string()),
            groups: groups.iter().map(ToString::to_string).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn missing_account_is_created_then_joined_to_groups() {
        let changes = UserHandler
            .diff("dev", &desired(Some("/bin/bash"), &["sudo", "docker"]), &Observed::Absent)
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert!(matches!(
            &changes[0],
            Op::Shell { script, .. }
                if script == "useradd --create-home --shell '/bin/bash' 'dev'"
        ));
        assert!(matches!(
            &changes[1],
            Op::Shell { script, .. } if script == "usermod -aG 'sudo,docker' 'dev'"
        ));
    }

    #[test]
    fn existing_account_only_joins_missing_groups() {
        let changes = UserHandler
            .diff(
                "dev",
                &desired(Some("/bin/bash"), &["sudo", "docker"]),
                &account("/bin/bash", &["dev", "sudo"]),
            )
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Op::Shell { script, .. } if script == "usermod -aG 'docker' 'dev'"
        ));
    }

    #[test]
    fn shell_drift_is_corrected() {
        let changes = UserHandler
            .diff("dev", &desired(Some("/bin/bash"), &[]), &account("/bin/sh", &["dev"]))
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            Op::Shell { script, .. } if script == "usermod --shell '/bin/bash' 'dev'"
        ));
    }

    #[test]
    fn converged_account_yields_nothing() {
        let changes = UserHandler
            .diff(
                "dev",
                &desired(Some("/bin/bash"), &["sudo"]),
                &account("/bin/bash", &["dev", "sudo"]),
            )
            .unwrap();
        assert!(changes.is_empty());
    }
}
