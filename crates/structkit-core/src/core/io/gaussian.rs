//! Final geometries from Gaussian log files.
//!
//! Only the last `Standard orientation` table of a log is read, as a single molecule in
//! model 1.

use super::containers::{ParsedFile, ParsedModel, ParsedMolecule, ReadOptions};
use super::traits::StructureReader;
use crate::core::models::atom::Atom;
use crate::core::models::molecule::Molecule;
use crate::core::models::structure::StructureError;
use crate::core::utils::identifiers::element_from_atomic_number;
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::debug;

const ORIENTATION_MARKER: &str = "Standard orientation";
const TABLE_RULE: &str = "---------";
/// The rule, two header lines and the closing header rule precede the data rows.
const HEADER_LINES: usize = 4;

#[derive(Debug, Error)]
pub enum GaussianError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: GaussianParseErrorKind },
    #[error("The Gaussian log file is empty")]
    Empty,
    #[error("No '{ORIENTATION_MARKER}' geometry was found in the Gaussian log file")]
    NoGeometry,
    #[error(transparent)]
    Structure(#[from] StructureError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GaussianParseErrorKind {
    #[error("Invalid atomic number '{0}'")]
    InvalidAtomicNumber(String),
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
}

pub struct GaussianLogFile;

/// Returns the rows of the last complete orientation table, with their line numbers.
fn last_orientation_block(lines: &[String]) -> Option<Vec<(usize, &str)>> {
    let mut last = None;
    let mut block: Option<Vec<(usize, &str)>> = None;

    for (i, line) in lines.iter().enumerate() {
        if line.contains(ORIENTATION_MARKER) {
            block = Some(Vec::new());
            continue;
        }
        let Some(rows) = block.as_mut() else {
            continue;
        };
        if rows.len() > HEADER_LINES && line.contains(TABLE_RULE) {
            last = block.take();
            continue;
        }
        rows.push((i + 1, line.as_str()));
    }
    last
}

fn parse_row(line_num: usize, tokens: &[&str], serial: u32) -> Result<Atom, GaussianError> {
    let invalid_number = || GaussianError::Parse {
        line: line_num,
        kind: GaussianParseErrorKind::InvalidAtomicNumber(tokens[1].to_string()),
    };
    let atomic_number: usize = tokens[1].parse().map_err(|_| invalid_number())?;
    let element = element_from_atomic_number(atomic_number).ok_or_else(invalid_number)?;

    let coordinate = |value: &str| -> Result<f64, GaussianError> {
        value.parse().map_err(|_| GaussianError::Parse {
            line: line_num,
            kind: GaussianParseErrorKind::InvalidFloat(value.to_string()),
        })
    };
    let position = Point3::new(coordinate(tokens[3])?, coordinate(tokens[4])?, coordinate(tokens[5])?);

    Ok(Atom::new(position)
        .with_number(serial)
        .with_name(element)
        .with_element(element))
}

impl StructureReader for GaussianLogFile {
    type Error = GaussianError;

    fn read_from(
        reader: &mut impl BufRead,
        options: &ReadOptions,
    ) -> Result<ParsedFile, GaussianError> {
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
        if lines.is_empty() {
            return Err(GaussianError::Empty);
        }
        let block = last_orientation_block(&lines).ok_or(GaussianError::NoGeometry)?;

        let mut molecule = Molecule::new(None);
        for (line_num, line) in block {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 6 || tokens[0].parse::<u32>().is_err() {
                continue;
            }
            let serial = molecule.len() as u32 + 1;
            molecule.add_atom(parse_row(line_num, &tokens, serial)?);
        }
        debug!(atoms = molecule.len(), "Parsed Gaussian geometry.");

        let mut parsed = ParsedFile::default();
        if options.wants_model(1) {
            let mut molecules = Vec::new();
            if options.wants_mol(1) {
                molecules.push(ParsedMolecule {
                    file_mol_num: 1,
                    molecule,
                });
            }
            parsed.models.push(ParsedModel {
                number: Some(1),
                molecules,
            });
        }
        Ok(parsed)
    }
}
