use super::{Context, load_structure};
use crate::cli::PivotArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use structkit::workflows;
use tracing::info;

pub fn run(args: PivotArgs, config: &PartialConfig, ctx: &Context) -> Result<()> {
    let settings = config.pivot(&args)?;
    let structure = load_structure(&args.input, &args.read)?;
    let reporter = ctx.reporter();

    info!("Invoking the pivot search...");
    let result = workflows::analysis::pivot(
        &structure,
        &args.ensemble.source(),
        &args.ensemble.selection()?,
        &settings,
        &reporter,
    )?;

    println!(
        "Motional pivot: ({:.3}, {:.3}, {:.3}) Å",
        result.pivot.x, result.pivot.y, result.pivot.z
    );
    println!(
        "Summed RMSD at the pivot: {:.4} Å after {} iteration(s)",
        result.objective, result.iterations
    );
    Ok(())
}
