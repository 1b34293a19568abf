//! Built-in diff handlers, one file per resource kind
//!
//! A handler turns (desired attributes, observed state) into primitive
//! operations. Handlers never probe and never apply; they only decide
//! what would have to happen.

use crate::error::{Error, Result};
use crate::types::Observed;

pub mod apt_repo;
pub mod file_block;
pub mod file_line;
pub mod package_set;
pub mod service;
pub mod shell;
pub mod user;

pub use apt_repo::AptRepoHandler;
pub use file_block::FileBlockHandler;
pub use file_line::FileLineHandler;
pub use package_set::PackageSetHandler;
pub use service::ServiceHandler;
pub use shell::ShellHandler;
pub use user::UserHandler;

/// Shape mismatch between what a handler expects and what it was handed
pub(crate) fn mismatch(id: &str, expected: &str, got: &dyn std::fmt::Debug) -> Error {
    Error::invalid_spec(id, format!("expected {expected}, got {got:?}"))
}

/// File-kind observations come back as content-or-absent
pub(crate) fn observed_file<'a>(
    id: &str,
    observed: &'a Observed,
) -> Result<Option<(&'a str, u32)>> {
    match observed {
        Observed::File { content, mode } => Ok(Some((content, *mode))),
        Observed::Absent => Ok(None),
        other => Err(mismatch(id, "a file observation", other)),
    }
}