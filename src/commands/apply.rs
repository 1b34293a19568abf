//! `forja apply` - reconcile the machine against the manifest

use anyhow::Result;
use colored::Colorize;
use converge::{
    converge, preview, CommandRunner, ExecContext, ExecMode, PlannedAction, Registry, ResourceKind,
    ResourceSpec, SystemFs, SystemProber, SystemRunner,
};

use crate::cli::ApplyArgs;
use crate::manifest::Manifest;
use crate::progress::ApplyProgress;
use crate::{report, ui, Context};

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<bool> {
    ui::header("Applying Manifest");

    let manifest = Manifest::load(&args.manifest)?;
    if manifest.resource.is_empty() {
        ui::warn("Manifest declares no resources");
        return Ok(true);
    }

    let registry = Registry::builtin();
    let runner = SystemRunner;
    let fs = SystemFs;
    let prober = SystemProber::new(&runner, &fs);

    // File probes and writes run with the process's own privileges;
    // `elevate` wraps shell operations only. An elevated file resource
    // therefore needs the whole process to be root.
    if root_required(&manifest.resource) && !running_as_root(&runner) {
        ui::error("manifest declares elevated file resources; re-run as root");
        return Ok(false);
    }

    // 1. Show what would change, guards evaluated against predicted outcomes
    let planned = preview(&manifest.resource, &registry, &prober)?;
    report::display_plan(&planned, ctx);

    let pending = planned.iter().any(|p| needs_execution(&p.action));
    let blocked = planned
        .iter()
        .any(|p| matches!(p.action, PlannedAction::Blocked { .. }));

    if args.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(!blocked);
    }

    if !pending {
        return Ok(true);
    }

    // 2. Confirm (unless --yes)
    if !args.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(true);
    }

    // 3. The single forward pass; re-probes, so a resource converged
    // between preview and now comes out Unchanged
    let exec = ExecContext::new(&runner, &fs).with_env(manifest.env.clone());
    let mut progress = ApplyProgress::new(manifest.resource.len() as u64);
    let ledger = converge(&manifest.resource, &registry, &prober, &exec, &mut progress)?;
    progress.finish();

    report::display_ledger(&ledger, ctx);
    report::print_summary(&ledger.summary(), ledger.is_success());

    Ok(ledger.is_success())
}

/// A blocked resource still runs so the pass records its failure in
/// the ledger and the exit code reflects it
fn needs_execution(action: &PlannedAction) -> bool {
    matches!(
        action,
        PlannedAction::Apply(_) | PlannedAction::Blocked { .. }
    )
}

/// Whether any resource writes files with elevated privileges
fn root_required(specs: &[ResourceSpec]) -> bool {
    specs.iter().any(|spec| {
        spec.exec.elevate
            && matches!(
                spec.kind(),
                ResourceKind::FileBlock | ResourceKind::FileLine | ResourceKind::AptRepository
            )
    })
}

fn running_as_root(runner: &dyn CommandRunner) -> bool {
    runner
        .run("id -u", &ExecMode::default())
        .map(|out| out.success && out.stdout_str().trim() == "0")
        .unwrap_or(false)
}

fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge::{CommandOutput, Desired};

    #[test]
    fn blocked_resources_count_as_pending_work() {
        assert!(needs_execution(&PlannedAction::Blocked {
            reason: "guard references undeclared resource".to_string(),
        }));
        assert!(needs_execution(&PlannedAction::Apply(vec![])));
        assert!(!needs_execution(&PlannedAction::NoChange));
        assert!(!needs_execution(&PlannedAction::Skip));
    }

    #[test]
    fn elevated_file_resources_require_root() {
        let sudoers = ResourceSpec::new(
            "/etc/sudoers.d/dev",
            Desired::FileBlock {
                content: "dev ALL=(ALL) NOPASSWD:ALL".to_string(),
                marker: None,
                mode: Some(0o440),
                owner: None,
            },
        )
        .elevated();
        assert!(root_required(&[sudoers]));

        // Shell resources elevate through sudo inside the runner, so
        // they do not need a root process
        let shell = ResourceSpec::new(
            "apt-upgrade",
            Desired::ShellCommand {
                commands: vec!["apt-get upgrade -y".to_string()],
                retryable: false,
            },
        )
        .elevated();
        assert!(!root_required(&[shell]));

        let unelevated = ResourceSpec::new(
            "/home/dev/.bashrc",
            Desired::FileLine {
                line: "eval \"$(mise activate bash)\"".to_string(),
                pattern: None,
                replace: None,
            },
        );
        assert!(!root_required(&[unelevated]));
    }

    struct FixedIdRunner(&'static str);

    impl CommandRunner for FixedIdRunner {
        fn run(&self, script: &str, _mode: &ExecMode) -> std::io::Result<CommandOutput> {
            assert_eq!(script, "id -u");
            Ok(CommandOutput {
                stdout: self.0.as_bytes().to_vec(),
                stderr: Vec::new(),
                success: true,
            })
        }
    }

    #[test]
    fn root_detection_reads_the_effective_uid() {
        assert!(running_as_root(&FixedIdRunner("0\n")));
        assert!(!running_as_root(&FixedIdRunner("1000\n")));
    }
}
