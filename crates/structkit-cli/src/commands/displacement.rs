use super::{Context, load_structure};
use crate::cli::DisplacementArgs;
use crate::error::Result;
use structkit::core::io::report;
use structkit::workflows;

pub fn run(args: DisplacementArgs, ctx: &Context) -> Result<()> {
    let structure = load_structure(&args.input, &args.read)?;
    let reporter = ctx.reporter();
    let result = workflows::analysis::displacements(
        &structure,
        &args.ensemble.source(),
        &args.ensemble.selection()?,
        args.centroid.as_ref(),
        &reporter,
    )?;
    let rows = result.rows();

    match &args.output {
        Some(path) => {
            report::write_rows_to_path(path, &rows)?;
            println!(
                "✓ {} displacement(s) written to: {}",
                rows.len(),
                path.display()
            );
        }
        None => report::write_rows(std::io::stdout().lock(), &rows, "stdout")?,
    }
    Ok(())
}
