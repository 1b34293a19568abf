//! Manifest loading - TOML resource declarations with environment interpolation
//!
//! Secrets never live in the manifest. `${VAR}` references in the
//! `[env]` table and in per-resource `exec.env` values are expanded from
//! the caller's environment at load time; a missing variable expands to
//! the empty string rather than failing the load.

use anyhow::{Context as AnyhowContext, Result};
use converge::ResourceSpec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Pass-through environment for every resource's operations
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub resource: Vec<ResourceSpec>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let mut manifest: Manifest = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

        manifest.interpolate(|var| std::env::var(var).unwrap_or_default());
        Ok(manifest)
    }

    fn interpolate(&mut self, lookup: impl Fn(&str) -> String) {
        for value in self.env.values_mut() {
            *value = expand(value, &lookup);
        }
        for spec in &mut self.resource {
            for value in spec.exec.env.values_mut() {
                *value = expand(value, &lookup);
            }
        }
    }
}

fn expand(value: &str, lookup: impl Fn(&str) -> String) -> String {
    shellexpand::env_with_context_no_errors(value, |var| Some(lookup(var))).to_string()
}
