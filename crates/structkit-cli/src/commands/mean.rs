use super::{load_structure, write_structure};
use crate::cli::MeanArgs;
use crate::error::Result;
use tracing::info;

pub fn run(args: MeanArgs) -> Result<()> {
    let mut structure = load_structure(&args.input, &args.read)?;
    let models = structure.num_models();
    structure.mean()?;
    info!(models, "Averaged the ensemble.");

    write_structure(&structure, &args.output, None)?;
    println!(
        "✓ Mean of {} model(s) written to: {}",
        models,
        args.output.display()
    );
    Ok(())
}
