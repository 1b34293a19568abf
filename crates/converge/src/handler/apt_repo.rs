//! APT repository handler - keyring plus source-line registration
//!
//! The identity names the list file under `/etc/apt/sources.list.d/`.
//! The signing-key fetch is emitted only when the source file itself
//! needs to change, which is the "fetch the key if the repo changed"
//! conditional folded into the diff.

use super::{mismatch, observed_file};
use crate::error::Result;
use crate::probe::apt_list_path;
use crate::registry::Handler;
use crate::types::{ChangeSet, Desired, Observed, Op, ResourceKind};
use std::path::PathBuf;

pub struct AptRepoHandler;

impl AptRepoHandler {
    fn keyring_for(id: &str, keyring_path: Option<&str>) -> String {
        keyring_path
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("/etc/apt/keyrings/{id}.gpg"))
    }
}

impl Handler for AptRepoHandler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::AptRepository
    }

    fn describe(&self, id: &str) -> String {
        format!("APT repository '{id}'")
    }

    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet> {
        let (source_line, key_url, keyring_path) = match desired {
            Desired::AptRepository {
                source_line,
                key_url,
                keyring_path,
            } => (source_line, key_url.as_deref(), keyring_path.as_deref()),
            other => return Err(mismatch(id, "apt_repository attributes", other)),
        };

        let want = format!("{}\n", source_line.trim());
        if let Some((current, _)) = observed_file(id, observed)?
            && current == want
        {
            return Ok(Vec::new());
        }

        let mut ops = Vec::new();
        // Key lands before the source file so apt never sees a source
        // it cannot verify.
        if let Some(key) = key_url {
            let keyring = Self::keyring_for(id, keyring_path);
            ops.push(Op::shell_retryable(format!(
                "curl -fsSL {key} | gpg --dearmor --yes -o {keyring}"
            )));
        }
        ops.push(Op::WriteFile {
            path: PathBuf::from(apt_list_path(id)),
            content: want,
            mode: Some(0o644),
        });
        Ok(ops)
    }
}
