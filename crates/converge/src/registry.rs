//! Resource registry - one handler per resource kind
//!
//! Registration happens once at process start through the builder; the
//! resulting map is immutable for the rest of the run, so a given spec
//! list always resolves to the same handlers.

use crate::error::{Error, Result};
use crate::handler;
use crate::types::{ChangeSet, Desired, Observed, ResourceKind};
use std::collections::HashMap;

/// Diff logic for one resource kind
///
/// A handler never touches the system: it turns a desired/observed pair
/// into the primitive operations that would converge them. Probing and
/// applying live elsewhere.
pub trait Handler: Send + Sync {
    /// The kind this handler reconciles
    fn kind(&self) -> ResourceKind;

    /// Default human-readable name for a resource of this kind
    fn describe(&self, id: &str) -> String;

    /// Compute the operations needed to move `observed` to `desired`
    ///
    /// An empty changeset means the resource is already converged.
    fn diff(&self, id: &str, desired: &Desired, observed: &Observed) -> Result<ChangeSet>;
}

/// Immutable kind → handler map
pub struct Registry {
    handlers: HashMap<ResourceKind, Box<dyn Handler>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// Registry with all built-in handlers
    pub fn builtin() -> Self {
        Self::builder()
            .register(Box::new(handler::PackageSetHandler))
            .register(Box::new(handler::AptRepoHandler))
            .register(Box::new(handler::FileBlockHandler))
            .register(Box::new(handler::FileLineHandler))
            .register(Box::new(handler::UserHandler))
            .register(Box::new(handler::ServiceHandler))
            .register(Box::new(handler::ShellHandler))
            .build()
    }

    pub fn lookup(&self, kind: ResourceKind) -> Result<&dyn Handler> {
        self.handlers
            .get(&kind)
            .map(Box::as_ref)
            .ok_or(Error::UnknownKind(kind))
    }

    pub fn knows(&self, kind: ResourceKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

/// Builder for [`Registry`]; consumed by `build` so no handler can be
/// added or replaced once a run starts
pub struct RegistryBuilder {
    handlers: HashMap<ResourceKind, Box<dyn Handler>>,
}

impl RegistryBuilder {
    pub fn register(mut self, handler: Box<dyn Handler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            handlers: self.handlers,
        }
    }
}
