use super::{Context, load_structure};
use crate::cli::PcaArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use structkit::core::io::report;
use structkit::workflows;

/// `<prefix>_<suffix>.csv`, next to the prefix.
fn output_path(prefix: &Path, suffix: &str) -> PathBuf {
    let stem = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    prefix.with_file_name(format!("{stem}_{suffix}.csv"))
}

pub fn run(args: PcaArgs, config: &PartialConfig, ctx: &Context) -> Result<()> {
    let settings = config.pca(&args)?;
    let structure = load_structure(&args.input, &args.read)?;
    let reporter = ctx.reporter();
    let result = workflows::analysis::principal_components(
        &structure,
        &args.ensemble.source(),
        &args.ensemble.selection()?,
        &args.observers,
        &settings,
        &reporter,
    )?;

    let total: f64 = result.result.values.iter().sum();
    println!("Mode  Value (Å²)    Share");
    for row in result.value_rows() {
        let share = if total > 0.0 { row.value / total * 100.0 } else { 0.0 };
        println!("{:>4}  {:>10.4}  {:>6.2}%", row.mode, row.value, share);
    }

    if let Some(prefix) = &args.output_prefix {
        let values = output_path(prefix, "values");
        let projections = output_path(prefix, "projections");
        report::write_rows_to_path(&values, &result.value_rows())?;
        report::write_projections_to_path(&projections, &result.labels(), &result.result.projections)?;
        println!(
            "✓ Mode values written to {} and projections to {}",
            values.display(),
            projections.display()
        );
    }
    Ok(())
}
