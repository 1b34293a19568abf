use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forja")]
#[command(version)]
#[command(about = "Declarative provisioning - reconcile a machine against a manifest", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Preview what apply would change, without touching anything
    Plan(PlanArgs),

    /// Reconcile the machine against the manifest
    Apply(ApplyArgs),

    /// Check the manifest for unknown kinds and dangling guards
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Manifest with the declared resources
    #[arg(short, long, default_value = "forja.toml")]
    pub manifest: PathBuf,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Manifest with the declared resources
    #[arg(short, long, default_value = "forja.toml")]
    pub manifest: PathBuf,

    /// Record predicted outcomes without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Manifest with the declared resources
    #[arg(short, long, default_value = "forja.toml")]
    pub manifest: PathBuf,
}
