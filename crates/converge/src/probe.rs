//! Fact prober - read-only observation of current system state
//!
//! A probe is always taken immediately before planning its resource and
//! never cached: staleness is unacceptable even though a probe is a
//! shell/file round-trip. "Does not exist yet" is a valid observation
//! (`Observed::Absent`), distinct from a probing failure.

use crate::context::{CommandRunner, FileStore};
use crate::error::{Error, Result};
use crate::types::{ExecMode, Observed, ResourceKind};
use std::collections::BTreeSet;
use std::path::Path;

/// Observation contract; implementations must be read-only
pub trait Prober {
    fn probe(&self, kind: ResourceKind, id: &str) -> Result<Observed>;
}

/// Probes the live system through the shell and the filesystem
///
/// Identity conventions per kind: `apt_repository` ids name a list file
/// under `/etc/apt/sources.list.d/`, `file_block`/`file_line` ids are the
/// file path, `user` and `service` ids are the account/unit name, and a
/// `shell_command` id that is an absolute path acts as a creates-sentinel.
///
/// Probes run unelevated, with the process's own privileges; a resource's
/// `elevate` flag covers its apply-time shell operations, not observation.
pub struct SystemProber<'a> {
    runner: &'a dyn CommandRunner,
    fs: &'a dyn FileStore,
}

impl<'a> SystemProber<'a> {
    pub fn new(runner: &'a dyn CommandRunner, fs: &'a dyn FileStore) -> Self {
        Self { runner, fs }
    }

    fn query(&self, kind: ResourceKind, id: &str, script: &str) -> Result<(bool, String)> {
        let output = self
            .runner
            .run(script, &ExecMode::default())
            .map_err(|e| Error::probe(kind, id, e))?;
        Ok((output.success, output.stdout_str()))
    }

    fn read_file(&self, kind: ResourceKind, id: &str, path: &Path) -> Result<Observed> {
        match self.fs.read(path) {
            Ok(Some(snapshot)) => Ok(Observed::File {
                content: snapshot.content,
                mode: snapshot.mode,
            }),
            Ok(None) => Ok(Observed::Absent),
            Err(e) => Err(Error::probe(kind, id, e)),
        }
    }

    fn installed_packages(&self, id: &str) -> Result<Observed> {
        let kind = ResourceKind::PackageSet;
        let (success, stdout) = self.query(
            kind,
            id,
            "dpkg-query -W -f='${Package}\\t${db:Status-Status}\\n'",
        )?;
        if !success {
            return Err(Error::probe(kind, id, "dpkg-query failed"));
        }

        let installed: BTreeSet<String> = stdout
            .lines()
            .filter_map(|line| {
                let (package, status) = line.split_once('\t')?;
                (status.trim() == "installed").then(|| package.to_string())
            })
            .collect();
        Ok(Observed::Packages { installed })
    }

    fn account(&self, id: &str) -> Result<Observed> {
        let kind = ResourceKind::User;
        let quoted = sh_quote(id);
        let (exists, passwd) = self.query(kind, id, &format!("getent passwd {quoted}"))?;
        if !exists {
            return Ok(Observed::Absent);
        }

        let shell = passwd
            .trim_end()
            .rsplit(':')
            .next()
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        let (ok, group_list) = self.query(kind, id, &format!("id -Gn {quoted}"))?;
        if !ok {
            return Err(Error::probe(kind, id, "id -Gn failed"));
        }
        let groups = group_list.split_whitespace().map(ToString::to_string).collect();

        Ok(Observed::Account { shell, groups })
    }

    fn unit(&self, id: &str) -> Result<Observed> {
        let kind = ResourceKind::Service;
        let quoted = sh_quote(id);

        let (enabled_ok, enabled_out) =
            self.query(kind, id, &format!("systemctl is-enabled {quoted}"))?;
        if enabled_out.trim() == "not-found" {
            return Ok(Observed::Absent);
        }
        let (active_ok, _) = self.query(kind, id, &format!("systemctl is-active {quoted}"))?;

        Ok(Observed::Unit {
            enabled: enabled_ok,
            active: active_ok,
        })
    }
}

impl Prober for SystemProber<'_> {
    fn probe(&self, kind: ResourceKind, id: &str) -> Result<Observed> {
        match kind {
            ResourceKind::PackageSet => self.installed_packages(id),
            ResourceKind::AptRepository => {
                let path = apt_list_path(id);
                self.read_file(kind, id, Path::new(&path))
            }
            ResourceKind::FileBlock | ResourceKind::FileLine => {
                self.read_file(kind, id, Path::new(id))
            }
            ResourceKind::User => self.account(id),
            ResourceKind::Service => self.unit(id),
            ResourceKind::ShellCommand => {
                // An absolute-path identity is a creates-sentinel; anything
                // else has no observable state and always plans to run.
                if id.starts_with('/') && self.fs.exists(Path::new(id)) {
                    Ok(Observed::Present)
                } else {
                    Ok(Observed::Absent)
                }
            }
        }
    }
}

/// Source list file an `apt_repository` identity manages
pub fn apt_list_path(id: &str) -> String {
    format!("/etc/apt/sources.list.d/{id}.list")
}

/// Single-quote a value for embedding in an `sh -c` script
pub fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sh_quote_wraps_and_escapes() {
        assert_eq!(sh_quote("plain"), "'plain'");
        assert_eq!(sh_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn apt_list_path_is_under_sources_list_d() {
        assert_eq!(apt_list_path("docker"), "/etc/apt/sources.list.d/docker.list");
    }
}
