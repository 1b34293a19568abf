//! # Converge
//!
//! An idempotent system-configuration reconciliation engine.
//!
//! Declared desired state flows through a single strictly-sequential
//! pass: each [`ResourceSpec`] is planned (guard, probe, diff) against
//! the outcome ledger so far, the resulting changeset is applied in
//! order, and the outcome is recorded for later resources' guards.
//! Nothing is revisited and nothing runs concurrently.
//!
//! ## Core concepts
//!
//! - **ResourceSpec**: one declared unit of desired state (a package
//!   set, a repository registration, a managed file block, ...)
//! - **Prober**: read-only observation of current state; "absent" is a
//!   valid observation, not an error
//! - **Registry**: one diff [`Handler`] per resource kind, frozen at
//!   process start
//! - **Executor**: applies primitive operations, with bounded
//!   exponential backoff for retryable-class operations
//! - **Ledger**: append-only per-run outcome record, queryable by later
//!   resources' guards
//!
//! ## Example
//!
//! ```ignore
//! use converge::{
//!     converge, Desired, ExecContext, Guard, NoProgress, Registry,
//!     ResourceSpec, SystemFs, SystemProber, SystemRunner,
//! };
//!
//! let registry = Registry::builtin();
//! let runner = SystemRunner;
//! let fs = SystemFs;
//! let prober = SystemProber::new(&runner, &fs);
//! let ctx = ExecContext::new(&runner, &fs);
//!
//! let specs = vec![
//!     ResourceSpec::new(
//!         "base",
//!         Desired::PackageSet {
//!             packages: vec!["curl".into(), "jq".into()],
//!             update_index: true,
//!             upgrade: false,
//!         },
//!     )
//!     .named("Base packages")
//!     .elevated(),
//!     ResourceSpec::new(
//!         "docker",
//!         Desired::Service { enabled: true, running: true },
//!     )
//!     .named("Docker service")
//!     .elevated(),
//! ];
//!
//! let ledger = converge(&specs, &registry, &prober, &ctx, &mut NoProgress)?;
//! assert!(ledger.is_success());
//! ```

pub mod context;
pub mod error;
pub mod executor;
pub mod handler;
pub mod planner;
pub mod probe;
pub mod registry;
pub mod reporter;
pub mod run;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types at crate root
pub use context::{
    CommandOutput, CommandRunner, ExecContext, FileSnapshot, FileStore, NoProgress, Progress,
    SystemFs, SystemRunner,
};
pub use error::{Error, Result};
pub use executor::execute;
pub use planner::{plan, Planned};
pub use probe::{Prober, SystemProber};
pub use registry::{Handler, Registry, RegistryBuilder};
pub use reporter::{Ledger, Summary};
pub use run::{converge, preview, validate_kinds, PlannedAction, PlannedResource};
pub use types::{
    ChangeSet, Desired, ExecMode, Guard, GuardTarget, Observed, Op, Outcome, OutcomeStatus,
    ResourceKind, ResourceSpec, RetryPolicy,
};
