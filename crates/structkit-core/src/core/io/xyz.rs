use super::containers::{ParsedFile, ParsedModel, ParsedMolecule, ReadOptions};
use super::traits::{StructureReader, StructureWriter};
use crate::core::models::atom::Atom;
use crate::core::models::molecule::Molecule;
use crate::core::models::structure::{Structure, StructureError};
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("The XYZ file is empty")]
    Empty,
    #[error(transparent)]
    Structure(#[from] StructureError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidCount(String),
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
}

/// The XYZ format: an optional atom count, then `element x y z` records.
pub struct XyzFile;

/// Output settings for [`XyzFile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XyzWriteOptions {
    /// Write only this model.
    pub model: Option<u32>,
}

fn parse_coordinate(value: &str, line: usize) -> Result<f64, XyzError> {
    value.parse().map_err(|_| XyzError::Parse {
        line,
        kind: XyzParseErrorKind::InvalidFloat(value.to_string()),
    })
}

fn build_molecule(records: &[(usize, Vec<&str>)]) -> Result<Molecule, XyzError> {
    let mut molecule = Molecule::new(None);
    for (serial, (line, tokens)) in records.iter().enumerate() {
        let position = Point3::new(
            parse_coordinate(tokens[1], *line)?,
            parse_coordinate(tokens[2], *line)?,
            parse_coordinate(tokens[3], *line)?,
        );
        molecule.add_atom(
            Atom::new(position)
                .with_number(serial as u32 + 1)
                .with_name(tokens[0])
                .with_element(tokens[0]),
        );
    }
    Ok(molecule)
}

impl StructureReader for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead, options: &ReadOptions) -> Result<ParsedFile, XyzError> {
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
        if lines.is_empty() {
            return Err(XyzError::Empty);
        }

        let mut total = None;
        let mut blocks = Vec::new();
        let mut records: Vec<(usize, Vec<&str>)> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if i == 0 && tokens.len() == 1 {
                let count = tokens[0].parse::<usize>().map_err(|_| XyzError::Parse {
                    line: 1,
                    kind: XyzParseErrorKind::InvalidCount(tokens[0].to_string()),
                })?;
                total = Some(count).filter(|&n| n > 0);
            }
            if total.is_some_and(|n| records.len() == n) {
                blocks.push(std::mem::take(&mut records));
            }
            if tokens.len() == 4 {
                records.push((i + 1, tokens));
            }
        }
        if !records.is_empty() {
            blocks.push(records);
        }

        let numbered = blocks.len() > 1;
        let mut parsed = ParsedFile::default();
        for (index, block) in blocks.iter().enumerate() {
            let file_model = index as u32 + 1;
            if !options.wants_model(file_model) {
                continue;
            }
            let mut molecules = Vec::new();
            if options.wants_mol(1) {
                molecules.push(ParsedMolecule {
                    file_mol_num: 1,
                    molecule: build_molecule(block)?,
                });
            }
            parsed.models.push(ParsedModel {
                number: numbered.then_some(file_model),
                molecules,
            });
        }

        debug!(models = parsed.models.len(), "Parsed XYZ file.");
        Ok(parsed)
    }
}

impl StructureWriter for XyzFile {
    type Options = XyzWriteOptions;
    type Error = XyzError;

    fn write_to(
        structure: &Structure,
        options: &XyzWriteOptions,
        writer: &mut impl Write,
    ) -> Result<(), XyzError> {
        let models = structure.model_loop(options.model);
        if let (Some(number), true) = (options.model, models.is_empty()) {
            return Err(StructureError::ModelNotFound(number).into());
        }
        for model in models {
            writeln!(writer, "{}", model.num_atoms())?;
            match model.number {
                Some(n) => writeln!(writer, "Model {n}")?,
                None => writeln!(writer)?,
            }
            for atom in model.molecules().iter().flat_map(|m| m.atoms()) {
                let element = atom
                    .element
                    .as_deref()
                    .or(atom.name.as_deref())
                    .unwrap_or("X");
                writeln!(
                    writer,
                    "{:<2} {:>14.6} {:>14.6} {:>14.6}",
                    element, atom.position.x, atom.position.y, atom.position.z
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str, options: &ReadOptions) -> Result<ParsedFile, XyzError> {
        XyzFile::read_from(&mut Cursor::new(text.as_bytes()), options)
    }

    const TWO_FRAMES: &str = "3\n\
        water frame\n\
        O 0.0 0.0 0.0\n\
        H 0.96 0.0 0.0\n\
        H -0.24 0.93 0.0\n\
        3\n\
        water frame\n\
        O 0.0 0.0 0.1\n\
        H 0.96 0.0 0.1\n\
        H -0.24 0.93 0.1\n";

    #[test]
    fn atom_count_splits_models() {
        let parsed = read(TWO_FRAMES, &ReadOptions::default()).unwrap();
        assert_eq!(parsed.models.len(), 2);
        assert_eq!(parsed.models[0].number, Some(1));
        assert_eq!(parsed.models[1].number, Some(2));

        let mol = &parsed.models[1].molecules[0].molecule;
        assert_eq!(mol.len(), 3);
        assert_eq!(mol.atoms()[1].name.as_deref(), Some("H"));
        assert_eq!(mol.atoms()[1].element.as_deref(), Some("H"));
        assert_eq!(mol.atoms()[2].number, Some(3));
        assert!((mol.atoms()[2].position.z - 0.1).abs() < 1e-12);
    }

    #[test]
    fn a_file_without_count_is_one_unnumbered_model() {
        let parsed = read("C 1.0 2.0 3.0\nN 4.0 5.0 6.0\n", &ReadOptions::default()).unwrap();
        assert_eq!(parsed.models.len(), 1);
        assert!(parsed.models[0].number.is_none());
        assert_eq!(parsed.models[0].molecules[0].molecule.len(), 2);
    }

    #[test]
    fn model_filter_uses_file_positions() {
        let options = ReadOptions {
            read_model: Some(vec![2]),
            ..ReadOptions::default()
        };
        let parsed = read(TWO_FRAMES, &options).unwrap();
        assert_eq!(parsed.models.len(), 1);
        assert_eq!(parsed.models[0].number, Some(2));
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(read("", &ReadOptions::default()), Err(XyzError::Empty)));
        assert!(matches!(
            read("three\nC 0 0 0\n", &ReadOptions::default()),
            Err(XyzError::Parse {
                line: 1,
                kind: XyzParseErrorKind::InvalidCount(_)
            })
        ));
        assert!(matches!(
            read("C 0 zero 0\n", &ReadOptions::default()),
            Err(XyzError::Parse {
                line: 1,
                kind: XyzParseErrorKind::InvalidFloat(_)
            })
        ));
    }

    #[test]
    fn writer_emits_one_frame_per_model() {
        let parsed = read(TWO_FRAMES, &ReadOptions::default()).unwrap();
        let mut structure = Structure::new();
        structure
            .pack(
                parsed
                    .models
                    .into_iter()
                    .map(|m| (m.number, m.molecules.into_iter().map(|p| p.molecule).collect()))
                    .collect(),
                false,
            )
            .unwrap();

        let mut buffer = Vec::new();
        XyzFile::write_to(&structure, &XyzWriteOptions::default(), &mut buffer).unwrap();
        let reparsed = XyzFile::read_from(&mut Cursor::new(buffer), &ReadOptions::default()).unwrap();
        assert_eq!(reparsed.models.len(), 2);
        let z = reparsed.models[1].molecules[0].molecule.atoms()[0].position.z;
        assert!((z - 0.1).abs() < 1e-6);
    }
}
