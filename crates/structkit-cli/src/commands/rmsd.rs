use super::load_structure;
use crate::cli::RmsdArgs;
use crate::error::Result;
use structkit::core::io::report;
use structkit::workflows;

pub fn run(args: RmsdArgs) -> Result<()> {
    let structure = load_structure(&args.input, &args.read)?;
    let report = workflows::analysis::rmsd(
        &structure,
        &args.ensemble.source(),
        &args.ensemble.selection()?,
    )?;

    println!(
        "RMSD of {} member(s) over {} atom(s): {:.4} Å",
        report.members.len(),
        report.atoms.len(),
        report.rmsd
    );

    if let Some(path) = &args.per_atom {
        report::write_rows_to_path(path, &report.rows())?;
        println!("✓ Per-atom RMSD written to: {}", path.display());
    }
    Ok(())
}
