//! Plan and outcome display

use crate::Context;
use colored::Colorize;
use converge::{Ledger, OutcomeStatus, PlannedAction, PlannedResource, Summary};

/// Display what an apply would do, in declaration order
pub fn display_plan(planned: &[PlannedResource], ctx: &Context) {
    if planned.iter().all(|p| matches!(p.action, PlannedAction::NoChange)) {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!("┌─ {} ─────────────────────────────────────────┐", "Plan".bold());
    println!("│");

    for resource in planned {
        let sudo_indicator = if resource.elevated {
            " [sudo]".red().to_string()
        } else {
            String::new()
        };

        match &resource.action {
            PlannedAction::NoChange => {
                println!(
                    "│   {} {:<30} {}",
                    "○".dimmed(),
                    resource.name,
                    "no change".dimmed()
                );
            }
            PlannedAction::Skip => {
                println!(
                    "│   {} {:<30} {}",
                    "⊘".dimmed(),
                    resource.name,
                    "skipped (guard)".dimmed()
                );
            }
            PlannedAction::Apply(changes) => {
                let count = format!(
                    "{} operation{}",
                    changes.len(),
                    if changes.len() == 1 { "" } else { "s" }
                );
                println!(
                    "│   {} {:<30} {}{}",
                    "~".yellow(),
                    resource.name,
                    count.dimmed(),
                    sudo_indicator
                );
                if ctx.verbose > 0 || !ctx.quiet {
                    for op in changes {
                        println!("│       {}", op.describe().dimmed());
                    }
                }
            }
            PlannedAction::Blocked { reason } => {
                println!(
                    "│   {} {:<30} {}",
                    "✗".red(),
                    resource.name,
                    reason.red()
                );
            }
        }
    }

    let to_apply = planned
        .iter()
        .filter(|p| matches!(p.action, PlannedAction::Apply(_)))
        .count();
    let sudo_count = planned
        .iter()
        .filter(|p| matches!(p.action, PlannedAction::Apply(_)) && p.elevated)
        .count();

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to apply ({} require sudo)",
        to_apply.to_string().bold(),
        sudo_count.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display every recorded outcome of a finished run
pub fn display_ledger(ledger: &Ledger, ctx: &Context) {
    println!();
    for outcome in ledger.iter() {
        match outcome.status {
            OutcomeStatus::Unchanged => {
                if !ctx.quiet {
                    println!("  {} {} {}", "○".dimmed(), outcome.name, "unchanged".dimmed());
                }
            }
            OutcomeStatus::Changed => {
                println!("  {} {}", "✓".green(), outcome.name);
            }
            OutcomeStatus::Skipped => {
                println!("  {} {} {}", "⊘".dimmed(), outcome.name, "skipped".dimmed());
            }
            OutcomeStatus::Failed => {
                let best_effort = if outcome.best_effort {
                    " (best effort)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!("  {} {}{}", "✗".red(), outcome.name, best_effort);
                if let Some(error) = &outcome.error {
                    println!("      {}", error.dimmed());
                }
            }
        }
    }
}

/// Print the final per-status counts
pub fn print_summary(summary: &Summary, success: bool) {
    println!();
    if success {
        println!("  {} Manifest applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Manifest applied with errors", "⚠".yellow().bold());
    }

    if summary.changed > 0 {
        println!("    • {} resources changed", summary.changed);
    }
    if summary.unchanged > 0 {
        println!("    • {} resources unchanged", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}
