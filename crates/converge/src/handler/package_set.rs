//! Package set handler - install-only APT convergence

use super::mismatch;
use crate::error::Result;
use crate::probe::sh_quote;
use crate::registry::Handler;
use crate::types::{ChangeSet, Desired, Observed, Op, ResourceKind};
use std::collections::BTreeSet;

/// Installs the desired packages that are missing; never removes anything
pub struct PackageSetHandler;

impl Handler for PackageSetHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::PackageSet
    }

    fn describe(&self, id: &str) -> String {
        format!("APT packages '{id}'")
    }

    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet> {
        let (packages, update_index, upgrade) = match desired {
            Desired::PackageSet {
                packages,
                update_index,
                upgrade,
            } => (packages, *update_index, *upgrade),
            other => return Err(mismatch(id, "package_set attributes", other)),
        };

        let installed: BTreeSet<&str> = match observed {
            Observed::Packages { installed } => installed.iter().map(String::as_str).collect(),
            Observed::Absent => BTreeSet::new(),
            other => return Err(mismatch(id, "a package observation", other)),
        };

        let missing: Vec<&str> = packages
            .iter()
            .map(String::as_str)
            .filter(|p| !installed.contains(p))
            .collect();
        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let noninteractive = vec![(
            "DEBIAN_FRONTEND".to_string(),
            "noninteractive".to_string(),
        )];

        let mut ops = Vec::new();
        if update_index {
            ops.push(Op::shell_retryable("apt-get update"));
        }
        if upgrade {
            ops.push(Op::Shell {
                script: "apt-get upgrade -y".to_string(),
                env: noninteractive.clone(),
                retryable: true,
            });
        }
        let names = missing
            .iter()
            .map(|p| sh_quote(p))
            .collect::<Vec<_>>()
            .join(" ");
        ops.push(Op::Shell {
            script: format!("apt-get install -y {names}"),
            env: noninteractive,
            retryable: true,
        });

        Ok(ops)
    }
}
