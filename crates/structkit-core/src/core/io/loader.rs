use super::containers::{ParsedFile, ReadOptions};
use super::gaussian::{GaussianError, GaussianLogFile};
use super::pdb::{PdbError, PdbFile};
use super::traits::StructureReader;
use super::xyz::{XyzError, XyzFile};
use crate::core::models::molecule::{FileSource, Molecule};
use crate::core::models::structure::{Structure, StructureError};
use std::path::Path;
use tracing::{info, instrument, warn};

/// How a file is placed into a [`Structure`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// 1-based molecule numbers to read; `None` reads all.
    pub read_mol: Option<Vec<usize>>,
    /// Names for the molecules read, one per molecule of each model.
    pub set_mol_name: Option<Vec<String>>,
    /// Model numbers to read; `None` reads all.
    pub read_model: Option<Vec<u32>>,
    /// New numbers for the models read, one per model.
    pub set_model_num: Option<Vec<u32>>,
    /// The alternate location indicator to keep.
    pub alt_loc: Option<char>,
    /// Merge molecules into existing molecules of the same name instead of failing.
    pub merge: bool,
}

impl LoadOptions {
    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            read_mol: self.read_mol.clone(),
            read_model: self.read_model.clone(),
            alt_loc: self.alt_loc,
        }
    }
}

impl Structure {
    /// Loads a PDB file. Returns `Ok(false)` when the file held no matching data.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if its molecules clash
    /// with the ones already loaded.
    #[instrument(skip_all, name = "load_pdb", fields(path = %path.as_ref().display()))]
    pub fn load_pdb<P: AsRef<Path>>(&mut self, path: P, options: &LoadOptions) -> Result<bool, PdbError> {
        let parsed = PdbFile::read_from_path(path.as_ref(), &options.read_options())?;
        Ok(self.load_parsed(path.as_ref(), parsed, options, true)?)
    }

    /// Loads an XYZ file. Returns `Ok(false)` when the file held no matching data.
    ///
    /// # Errors
    ///
    /// See [`Structure::load_pdb`].
    #[instrument(skip_all, name = "load_xyz", fields(path = %path.as_ref().display()))]
    pub fn load_xyz<P: AsRef<Path>>(&mut self, path: P, options: &LoadOptions) -> Result<bool, XyzError> {
        let parsed = XyzFile::read_from_path(path.as_ref(), &options.read_options())?;
        Ok(self.load_parsed(path.as_ref(), parsed, options, true)?)
    }

    /// Loads the final geometry of a Gaussian log file.
    ///
    /// The molecule is always named `<file root>_mol1`, so loading the same log twice
    /// without `merge` or `set_mol_name` is a duplicate-molecule error.
    ///
    /// # Errors
    ///
    /// See [`Structure::load_pdb`].
    #[instrument(skip_all, name = "load_gaussian", fields(path = %path.as_ref().display()))]
    pub fn load_gaussian<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &LoadOptions,
    ) -> Result<bool, GaussianError> {
        let parsed = GaussianLogFile::read_from_path(path.as_ref(), &options.read_options())?;
        Ok(self.load_parsed(path.as_ref(), parsed, options, false)?)
    }

    fn load_parsed(
        &mut self,
        path: &Path,
        parsed: ParsedFile,
        options: &LoadOptions,
        continue_numbering: bool,
    ) -> Result<bool, StructureError> {
        if parsed.is_empty() {
            warn!(path = %path.display(), "No structural data could be read from the file.");
            return Ok(false);
        }
        if let Some(numbers) = &options.set_model_num {
            if numbers.len() != parsed.models.len() {
                return Err(StructureError::Inconsistent(format!(
                    "{} new model numbers were given for {} models",
                    numbers.len(),
                    parsed.models.len()
                )));
            }
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_root = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_path_abs = std::path::absolute(path).ok();
        let first_model = self.first_model().map(|m| (m.number, m.num_molecules()));

        let mut packed = Vec::with_capacity(parsed.models.len());
        for (model_index, model) in parsed.models.into_iter().enumerate() {
            let target = match &options.set_model_num {
                Some(numbers) => Some(numbers[model_index]),
                None => model.number,
            };
            if let Some(names) = &options.set_mol_name {
                if names.len() != model.molecules.len() {
                    return Err(StructureError::Inconsistent(format!(
                        "{} new molecule names were given for {} molecules",
                        names.len(),
                        model.molecules.len()
                    )));
                }
            }
            let offset = match first_model {
                Some((first_number, count))
                    if continue_numbering
                        && (options.set_model_num.is_none() || target == first_number) =>
                {
                    count
                }
                _ => 0,
            };

            let molecules: Vec<Molecule> = model
                .molecules
                .into_iter()
                .enumerate()
                .map(|(mol_index, parsed_mol)| {
                    let mut molecule = parsed_mol.molecule;
                    molecule.name = Some(match &options.set_mol_name {
                        Some(names) => names[mol_index].clone(),
                        None => format!("{}_mol{}", file_root, parsed_mol.file_mol_num + offset),
                    });
                    molecule.source = Some(FileSource {
                        file_name: file_name.clone(),
                        file_path: Some(path.to_path_buf()),
                        file_path_abs: file_path_abs.clone(),
                        file_mol_num: Some(parsed_mol.file_mol_num),
                        file_model: model.number,
                    });
                    molecule
                })
                .collect();
            packed.push((target, molecules));
        }

        let num_models = packed.len();
        self.pack(packed, options.merge)?;
        for helix in parsed.helices {
            self.add_helix(helix);
        }
        for sheet in parsed.sheets {
            self.add_sheet(sheet);
        }
        info!(file = %file_name, models = num_models, "Loaded structural data.");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const WATER: &str = "3\n\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\nH -0.24 0.93 0.0\n";

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn molecules_are_named_after_the_file() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "water.xyz", WATER);

        let mut structure = Structure::new();
        assert!(structure.load_xyz(&path, &LoadOptions::default()).unwrap());

        let mol = &structure.models()[0].molecules()[0];
        assert_eq!(mol.name(), Some("water_mol1"));
        let source = mol.source.as_ref().unwrap();
        assert_eq!(source.file_name, "water.xyz");
        assert_eq!(source.file_mol_num, Some(1));
        assert!(source.file_path_abs.as_ref().unwrap().is_absolute());
    }

    #[test]
    fn repeated_loads_continue_the_molecule_count() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "water.xyz", WATER);

        let mut structure = Structure::new();
        structure.load_xyz(&path, &LoadOptions::default()).unwrap();
        structure.load_xyz(&path, &LoadOptions::default()).unwrap();

        let names: Vec<_> = structure.models()[0]
            .molecules()
            .iter()
            .map(|m| m.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["water_mol1", "water_mol2"]);
    }

    #[test]
    fn explicit_names_and_model_numbers_are_applied() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "water.xyz", WATER);

        let mut structure = Structure::new();
        let options = LoadOptions {
            set_mol_name: Some(vec!["solvent".into()]),
            set_model_num: Some(vec![5]),
            ..LoadOptions::default()
        };
        structure.load_xyz(&path, &options).unwrap();
        assert_eq!(structure.model_list(), vec![Some(5)]);
        assert!(structure.has_molecule("solvent", Some(5)).unwrap());

        let wrong = LoadOptions {
            set_model_num: Some(vec![1, 2]),
            ..LoadOptions::default()
        };
        assert!(matches!(
            structure.load_xyz(&path, &wrong),
            Err(XyzError::Structure(StructureError::Inconsistent(_)))
        ));
    }

    #[test]
    fn clashing_names_fail_unless_merged() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "water.xyz", WATER);
        let options = LoadOptions {
            set_mol_name: Some(vec!["solvent".into()]),
            ..LoadOptions::default()
        };

        let mut structure = Structure::new();
        structure.load_xyz(&path, &options).unwrap();
        assert!(matches!(
            structure.load_xyz(&path, &options),
            Err(XyzError::Structure(StructureError::DuplicateMolecule(_)))
        ));

        let merged = LoadOptions {
            merge: true,
            ..options
        };
        structure.load_xyz(&path, &merged).unwrap();
        assert_eq!(structure.models()[0].molecules()[0].len(), 6);
    }

    #[test]
    fn gaussian_molecules_keep_the_first_name() {
        let dir = tempdir().unwrap();
        let log = [
            " Standard orientation:",
            " ---------------------------------------------------------------------",
            " Center     Atomic      Atomic             Coordinates (Angstroms)",
            " Number     Number       Type             X           Y           Z",
            " ---------------------------------------------------------------------",
            "      1          8           0        0.000000    0.000000    0.117000",
            "      2          1           0        0.000000    0.757000   -0.468000",
            "      3          1           0        0.000000   -0.757000   -0.468000",
            " ---------------------------------------------------------------------",
            " Normal termination of Gaussian",
        ]
        .join("\n");
        let path = write_file(dir.path(), "opt.log", &log);

        let mut structure = Structure::new();
        assert!(structure.load_gaussian(&path, &LoadOptions::default()).unwrap());
        assert!(matches!(
            structure.load_gaussian(&path, &LoadOptions::default()),
            Err(GaussianError::Structure(StructureError::DuplicateMolecule(_)))
        ));

        let names: Vec<_> = structure.models()[0]
            .molecules()
            .iter()
            .map(|m| m.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["opt_mol1"]);
    }

    #[test]
    fn loading_into_a_later_model_must_line_up_with_the_first() {
        let dir = tempdir().unwrap();
        let atom = |serial: u32, x: f64| {
            format!(
                "ATOM  {serial:>5}  CA  GLY A   1    {x:>8.3}   0.000   0.000  1.00  0.00           C  "
            )
        };
        let text = [
            "MODEL        1".to_string(),
            atom(1, 0.0),
            "ENDMDL".to_string(),
            "MODEL        2".to_string(),
            atom(1, 0.5),
            "ENDMDL".to_string(),
            "END".to_string(),
        ]
        .join("\n");
        let ens = write_file(dir.path(), "ens.pdb", &text);
        let lig = write_file(dir.path(), "lig.xyz", WATER);

        let mut structure = Structure::new();
        structure.load_pdb(&ens, &LoadOptions::default()).unwrap();
        assert_eq!(structure.model_list(), vec![Some(1), Some(2)]);

        let into = |model: u32| LoadOptions {
            set_model_num: Some(vec![model]),
            ..LoadOptions::default()
        };
        structure.load_xyz(&lig, &into(1)).unwrap();
        assert!(structure.has_molecule("lig_mol2", Some(1)).unwrap());

        // The count only continues in the first model, so this lands as lig_mol1.
        assert!(matches!(
            structure.load_xyz(&lig, &into(2)),
            Err(XyzError::Structure(StructureError::Inconsistent(_)))
        ));
        assert_eq!(structure.model(2).unwrap().num_molecules(), 1);

        let named = LoadOptions {
            set_mol_name: Some(vec!["lig_mol2".into()]),
            ..into(2)
        };
        structure.load_xyz(&lig, &named).unwrap();
        structure.validate().unwrap();
        let second = structure.model(2).unwrap();
        assert_eq!(second.molecules()[1].name(), Some("lig_mol2"));
        assert_eq!(second.molecules()[1].len(), 3);
    }

    #[test]
    fn filtered_out_files_report_no_data() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "water.xyz", WATER);
        let options = LoadOptions {
            read_mol: Some(vec![2]),
            ..LoadOptions::default()
        };

        let mut structure = Structure::new();
        assert!(!structure.load_xyz(&path, &options).unwrap());
        assert!(structure.is_empty());
    }

    #[test]
    fn pdb_secondary_structure_is_kept() {
        let dir = tempdir().unwrap();
        let text = [
            "HELIX    1   1 GLY A    1  GLY A    1  1                                   1    ",
            "ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N  ",
            "ATOM      2  CA  GLY A   1       1.458   0.000   0.000  1.00  0.00           C  ",
            "END",
        ]
        .join("\n");
        let path = write_file(dir.path(), "gly.pdb", &text);

        let mut structure = Structure::new();
        assert!(structure.load_pdb(&path, &LoadOptions::default()).unwrap());
        assert_eq!(structure.helices().len(), 1);
        assert!(structure.has_molecule("gly_mol1", None).unwrap());
        assert_eq!(structure.models()[0].num_atoms(), 2);
    }
}
