//! Tabular CSV output for analysis results.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("I/O error for '{path}': {source}")]
    Io { path: String, source: std::io::Error },
}

/// The RMSD of one atom across an ensemble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtomRmsdRow {
    pub molecule: Option<String>,
    pub res_num: Option<i32>,
    pub res_name: Option<String>,
    pub atom_name: Option<String>,
    pub rmsd: f64,
}

/// The variance captured by one principal mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaValueRow {
    pub mode: usize,
    pub value: f64,
}

/// The rigid-body displacement between two ensemble members.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplacementRow {
    pub from: String,
    pub to: String,
    pub translation_x: f64,
    pub translation_y: f64,
    pub translation_z: f64,
    pub distance: f64,
    pub axis_x: f64,
    pub axis_y: f64,
    pub axis_z: f64,
    pub angle_deg: f64,
}

fn csv_error(path: &str) -> impl Fn(csv::Error) -> ReportError + '_ {
    move |source| ReportError::Csv {
        path: path.to_string(),
        source,
    }
}

/// Writes serialisable rows with a header derived from the field names.
pub fn write_rows<T: Serialize>(writer: impl Write, rows: &[T], label: &str) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).map_err(csv_error(label))?;
    }
    csv_writer.flush().map_err(|source| ReportError::Io {
        path: label.to_string(),
        source,
    })
}

/// Writes PCA projections: one row per member, one column per mode.
pub fn write_projections(
    writer: impl Write,
    members: &[String],
    projections: &[Vec<f64>],
    label: &str,
) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let num_modes = projections.first().map_or(0, Vec::len);
    let header = std::iter::once("member".to_string()).chain((1..=num_modes).map(|m| format!("mode_{m}")));
    csv_writer.write_record(header).map_err(csv_error(label))?;

    for (member, values) in members.iter().zip(projections) {
        let record = std::iter::once(member.clone()).chain(values.iter().map(|v| v.to_string()));
        csv_writer.write_record(record).map_err(csv_error(label))?;
    }
    csv_writer.flush().map_err(|source| ReportError::Io {
        path: label.to_string(),
        source,
    })
}

/// Creates `path` and writes `rows` into it.
pub fn write_rows_to_path<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<(), ReportError> {
    let label = path.as_ref().to_string_lossy().to_string();
    let file = std::fs::File::create(path.as_ref()).map_err(|source| ReportError::Io {
        path: label.clone(),
        source,
    })?;
    write_rows(file, rows, &label)
}

/// Creates `path` and writes PCA projections into it.
pub fn write_projections_to_path<P: AsRef<Path>>(
    path: P,
    members: &[String],
    projections: &[Vec<f64>],
) -> Result<(), ReportError> {
    let label = path.as_ref().to_string_lossy().to_string();
    let file = std::fs::File::create(path.as_ref()).map_err(|source| ReportError::Io {
        path: label.clone(),
        source,
    })?;
    write_projections(file, members, projections, &label)
}
