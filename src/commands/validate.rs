//! `forja validate` - static manifest checks, nothing probed or mutated
//!
//! Catches what the engine would only surface at run time: kinds without
//! a handler and guards naming a resource that is not declared earlier.

use anyhow::Result;
use converge::{validate_kinds, GuardTarget, Registry, ResourceKind, ResourceSpec};
use std::collections::HashSet;

use crate::cli::ValidateArgs;
use crate::manifest::Manifest;
use crate::{ui, Context};

pub fn run(ctx: &Context, args: &ValidateArgs) -> Result<bool> {
    ui::header("Validate");

    let manifest = Manifest::load(&args.manifest)?;
    let registry = Registry::builtin();

    let mut problems = Vec::new();
    if let Err(err) = validate_kinds(&manifest.resource, &registry) {
        problems.push(err.to_string());
    }
    problems.extend(dangling_guards(&manifest.resource, &registry));

    if !ctx.quiet {
        for (kind, id) in duplicate_identities(&manifest.resource) {
            ui::warn(&format!(
                "duplicate identity {kind} '{id}'; later guards see the most recent outcome"
            ));
        }
    }

    if problems.is_empty() {
        ui::success(&format!(
            "{} resources, all kinds known, all guards resolvable",
            manifest.resource.len()
        ));
        return Ok(true);
    }

    for problem in &problems {
        ui::error(problem);
    }
    Ok(false)
}

/// Guards must reference a resource declared strictly earlier
fn dangling_guards(specs: &[ResourceSpec], registry: &Registry) -> Vec<String> {
    let mut names: HashSet<String> = HashSet::new();
    let mut identities: HashSet<(ResourceKind, &str)> = HashSet::new();
    let mut problems = Vec::new();

    for spec in specs {
        if let Some(guard) = &spec.guard {
            let resolvable = match &guard.target {
                GuardTarget::Name { resource } => names.contains(resource),
                GuardTarget::Identity { kind, id } => identities.contains(&(*kind, id.as_str())),
            };
            if !resolvable {
                problems.push(format!(
                    "'{}' guards on {}, which is not declared earlier",
                    display_name(spec, registry),
                    guard.target
                ));
            }
        }

        names.insert(display_name(spec, registry));
        identities.insert((spec.kind(), spec.id.as_str()));
    }

    problems
}

fn duplicate_identities(specs: &[ResourceSpec]) -> Vec<(ResourceKind, &str)> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for spec in specs {
        if !seen.insert((spec.kind(), spec.id.as_str())) {
            duplicates.push((spec.kind(), spec.id.as_str()));
        }
    }
    duplicates
}

/// Run-time guard lookup matches outcome names, which fall back to the
/// handler's description when the spec has no label
fn display_name(spec: &ResourceSpec, registry: &Registry) -> String {
    if !spec.name.is_empty() {
        return spec.name.clone();
    }
    registry
        .lookup(spec.kind())
        .map(|h| h.describe(&spec.id))
        .unwrap_or_else(|_| format!("{} '{}'", spec.kind(), spec.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{Desired, Guard};

    fn shell(id: &str) -> ResourceSpec {
        ResourceSpec::new(
            id,
            Desired::ShellCommand {
                commands: vec!["true".to_string()],
                retryable: false,
            },
        )
    }

    #[test]
    fn guard_on_earlier_resource_resolves() {
        let registry = Registry::builtin();
        let specs = vec![
            shell("seed").named("Seed"),
            shell("gated").guarded(Guard::if_changed("Seed")),
        ];
        assert!(dangling_guards(&specs, &registry).is_empty());
    }

    #[test]
    fn guard_on_later_or_missing_resource_is_flagged() {
        let registry = Registry::builtin();
        let specs = vec![
            shell("gated").guarded(Guard::if_changed("Seed")),
            shell("seed").named("Seed"),
        ];
        let problems = dangling_guards(&specs, &registry);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("Seed"));
    }

    #[test]
    fn unnamed_resources_resolve_through_handler_descriptions() {
        let registry = Registry::builtin();
        let specs = vec![
            shell("/opt/sentinel"),
            shell("gated").guarded(Guard::if_changed("Shell commands '/opt/sentinel'")),
        ];
        assert!(dangling_guards(&specs, &registry).is_empty());
    }

    #[test]
    fn duplicate_identity_is_reported_once() {
        let specs = vec![shell("twice"), shell("twice"), shell("other")];
        let duplicates = duplicate_identities(&specs);
        assert_eq!(duplicates, vec![(converge::ResourceKind::ShellCommand, "twice")]);
    }
}
