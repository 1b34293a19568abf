//! `forja plan` - preview what apply would change

use anyhow::Result;
use converge::{preview, PlannedAction, Registry, SystemFs, SystemProber, SystemRunner};

use crate::cli::PlanArgs;
use crate::manifest::Manifest;
use crate::{report, ui, Context};

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<bool> {
    ui::header("Plan");

    let manifest = Manifest::load(&args.manifest)?;
    if manifest.resource.is_empty() {
        ui::warn("Manifest declares no resources");
        return Ok(true);
    }

    let registry = Registry::builtin();
    let runner = SystemRunner;
    let fs = SystemFs;
    let prober = SystemProber::new(&runner, &fs);

    let planned = preview(&manifest.resource, &registry, &prober)?;
    report::display_plan(&planned, ctx);

    let blocked = planned
        .iter()
        .any(|p| matches!(p.action, PlannedAction::Blocked { .. }));
    Ok(!blocked)
}
