use super::{load_structure, parse_selection, write_structure};
use crate::cli::ConvertArgs;
use crate::error::Result;
use structkit::core::models::structure::Structure;
use tracing::info;

/// Applies the requested edits in order: deletion, then collapsing.
pub fn edit(structure: &mut Structure, delete: Option<&str>, collapse: Option<u32>) -> Result<()> {
    if let Some(selection) = delete {
        let selection = parse_selection(Some(selection))?;
        let atoms = structure.select_with(&selection)?;
        info!(atoms = atoms.len(), "Deleting selected atoms.");
        structure.delete_atoms(&atoms, None)?;
    }
    if let Some(model) = collapse {
        info!(model, "Collapsing the ensemble.");
        structure.collapse_ensemble(model, None)?;
    }
    Ok(())
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let mut structure = load_structure(&args.input, &args.read)?;
    edit(&mut structure, args.delete.as_deref(), args.collapse)?;
    write_structure(&structure, &args.output, args.model)?;
    println!(
        "✓ Wrote {} model(s) to {}",
        if args.model.is_some() { 1 } else { structure.num_models() },
        args.output.display()
    );
    Ok(())
}
