//! Core types for declarative system reconciliation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The kinds of resources the engine knows how to reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    PackageSet,
    AptRepository,
    FileBlock,
    FileLine,
    User,
    Service,
    ShellCommand,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PackageSet => "package_set",
            Self::AptRepository => "apt_repository",
            Self::FileBlock => "file_block",
            Self::FileLine => "file_line",
            Self::User => "user",
            Self::Service => "service",
            Self::ShellCommand => "shell_command",
        };
        f.write_str(name)
    }
}

/// Kind-specific desired attributes for a resource
///
/// Internally tagged on `kind` so a manifest table can spell
/// `kind = "package_set"` next to the attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Desired {
    /// A set of packages that must be installed (install-only, never removes)
    PackageSet {
        packages: Vec<String>,
        /// Refresh the package index before installing
        #[serde(default)]
        update_index: bool,
        /// Upgrade already-installed packages alongside the install
        #[serde(default)]
        upgrade: bool,
    },
    /// An APT source registration; the identity names the list file
    /// under `/etc/apt/sources.list.d/`
    AptRepository {
        /// Full deb line, e.g. `deb [signed-by=...] https://... stable main`
        source_line: String,
        /// Signing key to fetch and dearmor when the source file changes
        #[serde(default)]
        key_url: Option<String>,
        /// Keyring target; defaults to `/etc/apt/keyrings/<id>.gpg`
        #[serde(default)]
        keyring_path: Option<String>,
    },
    /// A marker-delimited managed block inside the file named by the identity
    FileBlock {
        content: String,
        /// Marker label; defaults to "FORJA BLOCK"
        #[serde(default)]
        marker: Option<String>,
        #[serde(default)]
        mode: Option<u32>,
        /// chown target as `user` or `user:group`
        #[serde(default)]
        owner: Option<String>,
    },
    /// A single line ensured or substituted in the file named by the identity
    FileLine {
        /// Exact line to match (when `pattern` is not given)
        line: String,
        /// Regex matched against whole lines, overriding exact matching
        #[serde(default)]
        pattern: Option<String>,
        /// Replacement text; when absent the line is appended if missing
        #[serde(default)]
        replace: Option<String>,
    },
    /// A local user account; the identity is the username
    User {
        #[serde(default)]
        create_home: bool,
        #[serde(default)]
        shell: Option<String>,
        /// Supplementary groups the account must belong to
        #[serde(default)]
        groups: Vec<String>,
    },
    /// A systemd unit; the identity is the unit name
    Service {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        running: bool,
    },
    /// Raw shell commands; an absolute-path identity acts as a
    /// "creates" sentinel that makes the resource idempotent
    ShellCommand {
        commands: Vec<String>,
        /// Mark the commands as transient-failure prone (network installs),
        /// making them subject to the spec's retry policy
        #[serde(default)]
        retryable: bool,
    },
}

impl Desired {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::PackageSet { .. } => ResourceKind::PackageSet,
            Self::AptRepository { .. } => ResourceKind::AptRepository,
            Self::FileBlock { .. } => ResourceKind::FileBlock,
            Self::FileLine { .. } => ResourceKind::FileLine,
            Self::User { .. } => ResourceKind::User,
            Self::Service { .. } => ResourceKind::Service,
            Self::ShellCommand { .. } => ResourceKind::ShellCommand,
        }
    }
}

/// Observed state of one resource identity, produced by a [`crate::probe::Prober`]
///
/// `Absent` is a valid observation ("does not exist yet"), distinct from a
/// probe failure. Observations are never cached across resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    /// The resource does not exist yet
    Absent,
    /// The resource exists and carries no further detail (e.g. a
    /// shell-command sentinel path)
    Present,
    /// Installed package names
    Packages { installed: BTreeSet<String> },
    /// A file's content and permission bits
    File { content: String, mode: u32 },
    /// A user account's login shell and group memberships
    Account {
        shell: Option<String>,
        groups: BTreeSet<String>,
    },
    /// A systemd unit's enablement and activity
    Unit { enabled: bool, active: bool },
}

/// A primitive operation the executor knows how to apply
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Atomically write a file (temp file + rename) and set its mode
    WriteFile {
        path: PathBuf,
        content: String,
        mode: Option<u32>,
    },
    /// Run a shell script via the command runner
    Shell {
        script: String,
        /// Extra environment merged over the resource's environment
        env: Vec<(String, String)>,
        /// Whether a failure of this op is in the retryable class
        retryable: bool,
    },
}

impl Op {
    pub fn shell(script: impl Into<String>) -> Self {
        Self::Shell {
            script: script.into(),
            env: Vec::new(),
            retryable: false,
        }
    }

    pub fn shell_retryable(script: impl Into<String>) -> Self {
        Self::Shell {
            script: script.into(),
            env: Vec::new(),
            retryable: true,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Shell { retryable: true, .. })
    }

    /// Short human-readable form for logs and plan display
    pub fn describe(&self) -> String {
        match self {
            Self::WriteFile { path, .. } => format!("write {}", path.display()),
            Self::Shell { script, .. } => {
                let first = script.lines().next().unwrap_or(script);
                format!("run `{first}`")
            }
        }
    }
}

/// Ordered list of primitive operations; empty means the resource is unchanged
pub type ChangeSet = Vec<Op>;

/// Per-resource outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Unchanged,
    Changed,
    Skipped,
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Final record of one resource's reconciliation, owned by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub name: String,
    pub kind: ResourceKind,
    pub id: String,
    pub status: OutcomeStatus,
    /// Present iff `status` is `Failed`
    pub error: Option<String>,
    /// A best-effort failure does not fail the run
    pub best_effort: bool,
}

impl Outcome {
    fn base(name: &str, spec: &ResourceSpec, status: OutcomeStatus) -> Self {
        Self {
            name: name.to_string(),
            kind: spec.kind(),
            id: spec.id.clone(),
            status,
            error: None,
            best_effort: spec.best_effort,
        }
    }

    pub fn unchanged(name: &str, spec: &ResourceSpec) -> Self {
        Self::base(name, spec, OutcomeStatus::Unchanged)
    }

    pub fn changed(name: &str, spec: &ResourceSpec) -> Self {
        Self::base(name, spec, OutcomeStatus::Changed)
    }

    pub fn skipped(name: &str, spec: &ResourceSpec) -> Self {
        Self::base(name, spec, OutcomeStatus::Skipped)
    }

    pub fn failed(name: &str, spec: &ResourceSpec, error: impl fmt::Display) -> Self {
        let mut outcome = Self::base(name, spec, OutcomeStatus::Failed);
        outcome.error = Some(error.to_string());
        outcome
    }
}

/// Predicate gating a resource on a prior resource's outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guard {
    #[serde(flatten)]
    pub target: GuardTarget,
    /// Status the prior outcome must have for this resource to run
    pub status: OutcomeStatus,
}

/// How a guard names the prior resource it reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuardTarget {
    Name { resource: String },
    Identity { kind: ResourceKind, id: String },
}

impl Guard {
    /// Run only if the named resource changed (`_if=repo.did_change` shape)
    pub fn if_changed(resource: impl Into<String>) -> Self {
        Self {
            target: GuardTarget::Name {
                resource: resource.into(),
            },
            status: OutcomeStatus::Changed,
        }
    }

    /// Run only if the named resource failed (the legacy-iptables-flip shape)
    pub fn if_failed(resource: impl Into<String>) -> Self {
        Self {
            target: GuardTarget::Name {
                resource: resource.into(),
            },
            status: OutcomeStatus::Failed,
        }
    }
}

impl fmt::Display for GuardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name { resource } => write!(f, "resource '{resource}'"),
            Self::Identity { kind, id } => write!(f, "{kind} '{id}'"),
        }
    }
}

/// Bounded exponential backoff for retryable operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// First delay, in milliseconds
    #[serde(default = "default_floor_ms")]
    pub floor_ms: u64,
    /// Delay ceiling, in milliseconds; the delay doubles up to this
    #[serde(default = "default_ceiling_ms")]
    pub ceiling_ms: u64,
}

fn default_floor_ms() -> u64 {
    500
}

fn default_ceiling_ms() -> u64 {
    8_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            floor_ms: default_floor_ms(),
            ceiling_ms: default_ceiling_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(32);
        let ms = self
            .floor_ms
            .saturating_mul(1_u64 << exp)
            .min(self.ceiling_ms);
        Duration::from_millis(ms)
    }
}

/// Per-resource execution mode: privilege elevation, impersonation and
/// environment, threaded explicitly instead of read from ambient state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecMode {
    /// Run the resource's operations with elevated privileges
    #[serde(default)]
    pub elevate: bool,
    /// Run the resource's operations as this user
    #[serde(default)]
    pub run_as: Option<String>,
    /// Environment passed through opaquely to the operations
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A single declared unit of desired state
///
/// `id` uniquely identifies the resource within its kind for the duration
/// of one run; a later duplicate sees the earlier duplicate's outcome
/// through the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Human-readable label; when empty the handler's `describe` is used
    #[serde(default)]
    pub name: String,
    /// Identity within the kind (a repo name, a file path, a username)
    pub id: String,
    #[serde(flatten)]
    pub desired: Desired,
    /// Optional predicate over a prior resource's outcome
    #[serde(default)]
    pub guard: Option<Guard>,
    /// Optional retry policy for retryable-class operations
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
    /// Failure is logged but does not fail the run
    #[serde(default)]
    pub best_effort: bool,
    /// Failure stops the run after this resource's outcome is recorded
    #[serde(default)]
    pub run_fatal: bool,
    #[serde(default)]
    pub exec: ExecMode,
}

impl ResourceSpec {
    pub fn new(id: impl Into<String>, desired: Desired) -> Self {
        Self {
            name: String::new(),
            id: id.into(),
            desired,
            guard: None,
            retry: None,
            best_effort: false,
            run_fatal: false,
            exec: ExecMode::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    pub fn elevated(mut self) -> Self {
        self.exec.elevate = true;
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.desired.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_to_ceiling() {
        let policy = RetryPolicy {
            max_attempts: 5,
            floor_ms: 500,
            ceiling_ms: 8_000,
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2_000));
        assert_eq!(policy.delay_after(10), Duration::from_millis(8_000));
    }

    #[test]
    fn desired_kind_matches_variant() {
        let desired = Desired::Service {
            enabled: true,
            running: true,
        };
        assert_eq!(desired.kind(), ResourceKind::Service);
    }

    #[test]
    fn spec_deserializes_from_toml_table() {
        let spec: ResourceSpec = toml::from_str(
            r#"
            name = "Base packages"
            id = "base"
            kind = "package_set"
            packages = ["curl", "jq"]
            update_index = true
            best_effort = true

            [exec]
            elevate = true
        "#,
        )
        .unwrap();

        assert_eq!(spec.kind(), ResourceKind::PackageSet);
        assert!(spec.best_effort);
        assert!(spec.exec.elevate);
        match &spec.desired {
            Desired::PackageSet {
                packages,
                update_index,
                ..
            } => {
                assert_eq!(packages, &["curl".to_string(), "jq".to_string()]);
                assert!(*update_index);
            }
            other => panic!("unexpected desired: {other:?}"),
        }
    }

    #[test]
    fn guard_deserializes_by_name_and_identity() {
        let by_name: Guard =
            toml::from_str(r#"resource = "Docker service"
status = "failed""#)
                .unwrap();
        assert_eq!(by_name, Guard::if_failed("Docker service"));

        let by_identity: Guard = toml::from_str(
            r#"kind = "apt_repository"
id = "docker"
status = "changed""#,
        )
        .unwrap();
        match by_identity.target {
            GuardTarget::Identity { kind, ref id } => {
                assert_eq!(kind, ResourceKind::AptRepository);
                assert_eq!(id, "docker");
            }
            ref other => panic!("unexpected target: {other:?}"),
        }
    }
}
