use super::containers::{ParsedFile, ReadOptions};
use crate::core::models::structure::Structure;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading a coordinate file format.
///
/// Readers only parse; placing the parsed molecules into a [`Structure`] is done by the
/// loader, which also handles naming and provenance.
pub trait StructureReader {
    /// The error type for read operations.
    type Error: Error + From<io::Error>;

    /// Parses a whole file from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed or the reader fails.
    fn read_from(reader: &mut impl BufRead, options: &ReadOptions) -> Result<ParsedFile, Self::Error>;

    /// Parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<ParsedFile, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, options)
    }
}

/// Defines the interface for serialising a structure.
pub trait StructureWriter {
    /// Format-specific output settings.
    type Options;

    /// The error type for write operations.
    type Error: Error + From<io::Error>;

    /// Writes `structure` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the structure cannot be represented in the format or writing fails.
    fn write_to(
        structure: &Structure,
        options: &Self::Options,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes `structure` to a newly created file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        structure: &Structure,
        options: &Self::Options,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(structure, options, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
