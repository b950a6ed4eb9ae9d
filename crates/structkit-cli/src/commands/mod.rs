pub mod convert;
pub mod displacement;
pub mod info;
pub mod mean;
pub mod pca;
pub mod pivot;
pub mod rmsd;
pub mod superimpose;

use crate::cli::{EnsembleArgs, InputFormat, ReadArgs};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::path::Path;
use structkit::core::io::loader::LoadOptions;
use structkit::core::io::pdb::{PdbFile, PdbWriteOptions};
use structkit::core::io::traits::StructureWriter;
use structkit::core::io::xyz::{XyzFile, XyzWriteOptions};
use structkit::core::models::structure::Structure;
use structkit::core::selection::AtomSelection;
use structkit::engine::coordinates::EnsembleSource;
use structkit::engine::progress::ProgressReporter;
use tracing::info;

/// Settings every command shares.
pub struct Context {
    pub quiet: bool,
}

impl Context {
    pub fn reporter(&self) -> ProgressReporter<'static> {
        let handler = if self.quiet {
            CliProgressHandler::hidden()
        } else {
            CliProgressHandler::new()
        };
        ProgressReporter::with_callback(handler.get_callback())
    }
}

fn detect_format(path: &Path, explicit: Option<InputFormat>) -> Result<InputFormat> {
    if let Some(format) = explicit {
        return Ok(format);
    }
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdb" | "ent" => Ok(InputFormat::Pdb),
        "xyz" => Ok(InputFormat::Xyz),
        "log" | "out" => Ok(InputFormat::Gaussian),
        _ => Err(CliError::Argument(format!(
            "Cannot tell the format of '{}' from its extension; use --format.",
            path.display()
        ))),
    }
}

/// Reads `path` into a new structure.
pub fn load_structure(path: &Path, args: &ReadArgs) -> Result<Structure> {
    let options = LoadOptions {
        read_mol: args.read_mol.clone(),
        read_model: args.read_model.clone(),
        alt_loc: args.alt_loc,
        ..LoadOptions::default()
    };
    let format = detect_format(path, args.format)?;
    info!(path = %path.display(), ?format, "Loading structure.");

    let mut structure = Structure::new();
    let loaded = match format {
        InputFormat::Pdb => structure
            .load_pdb(path, &options)
            .map_err(|e| CliError::parsing(path, e))?,
        InputFormat::Xyz => structure
            .load_xyz(path, &options)
            .map_err(|e| CliError::parsing(path, e))?,
        InputFormat::Gaussian => structure
            .load_gaussian(path, &options)
            .map_err(|e| CliError::parsing(path, e))?,
    };
    if !loaded {
        return Err(CliError::Argument(format!(
            "No structural data could be read from '{}'.",
            path.display()
        )));
    }
    Ok(structure)
}

/// Writes `structure` as XYZ when `path` ends in `.xyz`, and as PDB otherwise.
pub fn write_structure(structure: &Structure, path: &Path, model: Option<u32>) -> Result<()> {
    let is_xyz = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("xyz"));
    if is_xyz {
        XyzFile::write_to_path(structure, &XyzWriteOptions { model }, path)
            .map_err(|e| CliError::writing(path, e))?;
    } else {
        let options = PdbWriteOptions {
            model,
            program_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            created_on: Some(chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()),
        };
        PdbFile::write_to_path(structure, &options, path).map_err(|e| CliError::writing(path, e))?;
    }
    info!(path = %path.display(), "Structure written.");
    Ok(())
}

pub fn parse_selection(selection: Option<&str>) -> Result<AtomSelection> {
    match selection {
        Some(s) => Ok(s.parse()?),
        None => Ok(AtomSelection::all()),
    }
}

impl EnsembleArgs {
    pub fn source(&self) -> EnsembleSource {
        match &self.molecules {
            Some(names) => EnsembleSource::Molecules {
                model: None,
                names: names.clone(),
            },
            None => EnsembleSource::Models {
                models: self.models.clone(),
                molecule: None,
            },
        }
    }

    pub fn selection(&self) -> Result<AtomSelection> {
        parse_selection(self.atoms.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn formats_follow_the_extension() {
        assert_eq!(detect_format(Path::new("a.PDB"), None).unwrap(), InputFormat::Pdb);
        assert_eq!(detect_format(Path::new("a.xyz"), None).unwrap(), InputFormat::Xyz);
        assert_eq!(detect_format(Path::new("opt.log"), None).unwrap(), InputFormat::Gaussian);
        assert_eq!(
            detect_format(Path::new("a.dat"), Some(InputFormat::Xyz)).unwrap(),
            InputFormat::Xyz
        );
        assert!(matches!(
            detect_format(&PathBuf::from("a.dat"), None),
            Err(CliError::Argument(_))
        ));
    }

    #[test]
    fn molecules_take_precedence_over_models() {
        let args = EnsembleArgs {
            atoms: None,
            models: None,
            molecules: Some(vec!["a".into(), "b".into()]),
        };
        assert!(matches!(args.source(), EnsembleSource::Molecules { ref names, .. } if names.len() == 2));

        let args = EnsembleArgs {
            atoms: Some("@CA".into()),
            models: Some(vec![2, 3]),
            molecules: None,
        };
        assert!(matches!(args.source(), EnsembleSource::Models { models: Some(_), .. }));
        assert!(args.selection().is_ok());
    }

    #[test]
    fn bad_selections_are_reported() {
        assert!(matches!(parse_selection(Some("@CA:5")), Err(CliError::Selection(_))));
    }
}
