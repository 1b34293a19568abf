//! Execution context and the OS-facing facilities behind it
//!
//! The engine never reads ambient state: which host facilities to use,
//! whether to elevate, who to impersonate and what environment to pass
//! all travel through an explicit [`ExecContext`] plus each spec's
//! [`ExecMode`]. The traits here exist so tests can substitute scripted
//! fakes for the shell and the filesystem.

use crate::types::{ExecMode, Outcome};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::{Command, Output};

/// Captured result of one shell invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
        }
    }
}

impl CommandOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Shell/process execution facility
///
/// Non-zero exit is not an `Err`: it comes back as `success = false` with
/// the captured stderr, and the executor decides what failure means. `Err`
/// is reserved for not being able to spawn at all.
pub trait CommandRunner: Send + Sync {
    fn run(&self, script: &str, mode: &ExecMode) -> io::Result<CommandOutput>;
}

/// Runs scripts through `sh -c`, wrapping with sudo for elevation and
/// `sudo -u` for impersonation
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, script: &str, mode: &ExecMode) -> io::Result<CommandOutput> {
        let mut cmd = if mode.elevate || mode.run_as.is_some() {
            let mut c = Command::new("sudo");
            if let Some(user) = &mode.run_as {
                c.args(["-u", user]);
            }
            // sudo strips the environment; carry it across explicitly
            for (key, value) in &mode.env {
                c.arg(format!("{key}={value}"));
            }
            c.args(["sh", "-c", script]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", script]);
            c.envs(&mode.env);
            c
        };

        cmd.output().map(CommandOutput::from)
    }
}

/// A file's content and permission bits as read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub content: String,
    pub mode: u32,
}

/// Filesystem facility with atomic write-and-chmod
///
/// Reads and writes run with the process's own privileges; per-resource
/// elevation applies to shell operations only. A manifest that writes
/// root-owned files needs a root process.
pub trait FileStore: Send + Sync {
    /// Read a file, `None` if it does not exist
    fn read(&self, path: &Path) -> io::Result<Option<FileSnapshot>>;

    /// Write content to a temp file in the target directory, set the mode,
    /// then rename over the destination
    fn write_atomic(&self, path: &Path, content: &str, mode: Option<u32>) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// [`FileStore`] backed by the real filesystem
pub struct SystemFs;

impl FileStore for SystemFs {
    fn read(&self, path: &Path) -> io::Result<Option<FileSnapshot>> {
        use std::os::unix::fs::PermissionsExt;

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let mode = std::fs::metadata(path)?.permissions().mode() & 0o7777;
                Ok(Some(FileSnapshot { content, mode }))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_atomic(&self, path: &Path, content: &str, mode: Option<u32>) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
            .to_string_lossy()
            .to_string();
        let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()));

        std::fs::write(&tmp, content)?;
        if let Some(bits) = mode {
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(bits))?;
        }
        std::fs::rename(&tmp, path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Everything a run needs from its caller, threaded through the planner
/// and executor instead of living in globals
pub struct ExecContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub fs: &'a dyn FileStore,
    /// Predict outcomes without issuing any primitive operation
    pub dry_run: bool,
    /// Pass-through environment (secrets for authenticated downloads);
    /// the engine never inspects the values
    pub base_env: BTreeMap<String, String>,
}

impl<'a> ExecContext<'a> {
    pub fn new(runner: &'a dyn CommandRunner, fs: &'a dyn FileStore) -> Self {
        Self {
            runner,
            fs,
            dry_run: false,
            base_env: BTreeMap::new(),
        }
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    /// Spec-level mode with the context's pass-through environment
    /// underneath the spec's own
    pub fn mode_for(&self, exec: &ExecMode) -> ExecMode {
        let mut env = self.base_env.clone();
        env.extend(exec.env.clone());
        ExecMode {
            elevate: exec.elevate,
            run_as: exec.run_as.clone(),
            env,
        }
    }
}

/// Progress notifications for a run; the CLI hooks a progress bar in here
pub trait Progress {
    fn on_resource_start(&mut self, name: &str);
    fn on_resource_complete(&mut self, outcome: &Outcome);
}

/// No-op progress sink
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_resource_start(&mut self, _name: &str) {}
    fn on_resource_complete(&mut self, _outcome: &Outcome) {}
}
