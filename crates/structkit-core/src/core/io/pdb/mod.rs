//! Reading and writing of Protein Data Bank files.
//!
//! The reader splits a file into models and molecules, keeps `HELIX`/`SHEET` annotations
//! and `CONECT` bonds, and skips the remaining header sections. The writer emits a
//! self-consistent file in which every record is exactly 80 characters wide.

mod reader;
pub mod records;
mod writer;

pub use writer::PdbWriteOptions;

use crate::core::models::structure::StructureError;
use std::io;
use thiserror::Error;

/// Width of every PDB record.
pub const RECORD_WIDTH: usize = 80;

/// The PDB format.
pub struct PdbFile;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("The PDB file is empty")]
    Empty,
    #[error("The PDB record '{record}' is {len} characters long instead of 80")]
    RecordLength { record: String, len: usize },
    #[error(transparent)]
    Structure(#[from] StructureError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("The MODEL record '{0}' is corrupt")]
    CorruptModel(String),
    #[error("Alternate location indicators are present, but no coordinate set was selected")]
    AltLocNotSelected,
}
