//! Fixed-width PDB record formatting.
//!
//! Every function returns the record text without a line terminator, and fails with
//! [`PdbError::RecordLength`] when the fields do not fit into exactly 80 columns.

use super::{PdbError, RECORD_WIDTH};
use crate::core::models::secondary::{Helix, Registration, Sheet};
use nalgebra::Point3;
use std::fmt::Display;

/// Width of the free text in `REMARK` records.
pub const REMARK_WIDTH: usize = 68;

fn text<T: Display>(value: Option<T>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

fn validate(record: String) -> Result<String, PdbError> {
    let len = record.chars().count();
    if len == RECORD_WIDTH {
        Ok(record)
    } else {
        Err(PdbError::RecordLength { record, len })
    }
}

/// Greedy word wrapping; words longer than `width` are split.
fn wrap(input: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in input.split_whitespace() {
        let mut rest: Vec<char> = word.chars().collect();
        let used = current.chars().count();
        if used > 0 && used + 1 + rest.len() <= width {
            current.push(' ');
            current.extend(rest);
            continue;
        }
        if used > 0 {
            lines.push(std::mem::take(&mut current));
        }
        while rest.len() > width {
            lines.push(rest.drain(..width).collect());
        }
        current = rest.into_iter().collect();
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// The fields shared by `ATOM` and `HETATM` records.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateFields<'a> {
    pub serial: u32,
    pub name: &'a str,
    pub alt_loc: Option<char>,
    pub res_name: Option<&'a str>,
    pub chain_id: Option<char>,
    pub res_seq: Option<i32>,
    pub i_code: Option<char>,
    pub position: Point3<f64>,
    pub occupancy: f64,
    pub temp_factor: f64,
    pub element: Option<&'a str>,
    pub charge: Option<&'a str>,
}

fn coordinate(record: &str, name: String, fields: &CoordinateFields<'_>) -> Result<String, PdbError> {
    validate(format!(
        "{:<6}{:>5} {:<4}{:1}{:>3} {:1}{:>4}{:1}   {:8.3}{:8.3}{:8.3}{:6.2}{:6.2}          {:>2}{:>2}",
        record,
        fields.serial,
        name,
        text(fields.alt_loc),
        text(fields.res_name),
        text(fields.chain_id),
        text(fields.res_seq),
        text(fields.i_code),
        fields.position.x,
        fields.position.y,
        fields.position.z,
        fields.occupancy,
        fields.temp_factor,
        text(fields.element),
        text(fields.charge),
    ))
}

/// An `ATOM` record. One-letter atom names are shifted into column 14.
pub fn atom(fields: &CoordinateFields<'_>) -> Result<String, PdbError> {
    let name = if fields.name.chars().count() == 1 {
        format!(" {}", fields.name)
    } else {
        fields.name.to_string()
    };
    coordinate("ATOM", name, fields)
}

/// A `HETATM` record. The atom name is right-justified.
pub fn hetatm(fields: &CoordinateFields<'_>) -> Result<String, PdbError> {
    coordinate("HETATM", format!("{:>4}", fields.name), fields)
}

pub fn ter(
    serial: u32,
    res_name: Option<&str>,
    chain_id: Option<char>,
    res_seq: Option<i32>,
) -> Result<String, PdbError> {
    validate(format!(
        "{:<6}{:>5}      {:>3} {:1}{:>4}{:1}{:53}",
        "TER",
        serial,
        text(res_name),
        text(chain_id),
        text(res_seq),
        "",
        ""
    ))
}

/// A `CONECT` record for up to four bonded atoms; further entries are ignored.
pub fn conect(serial: u32, bonded: &[u32]) -> Result<String, PdbError> {
    let mut columns: [String; 4] = Default::default();
    for (column, number) in columns.iter_mut().zip(bonded) {
        *column = number.to_string();
    }
    validate(format!(
        "{:<6}{:>5}{:>5}{:>5}{:>5}{:>5}{:49}",
        "CONECT", serial, columns[0], columns[1], columns[2], columns[3], ""
    ))
}

pub fn model(number: u32) -> Result<String, PdbError> {
    validate(format!("{:<6}    {:>4}{:66}", "MODEL", number, ""))
}

pub fn endmdl() -> String {
    format!("{:<80}", "ENDMDL")
}

pub fn end() -> String {
    format!("{:<80}", "END")
}

/// Record counts reported in the `MASTER` record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MasterCounts {
    pub num_remark: usize,
    pub num_het: usize,
    pub num_helix: usize,
    pub num_sheet: usize,
    pub num_coord: usize,
    pub num_ter: usize,
    pub num_conect: usize,
}

pub fn master(counts: &MasterCounts) -> Result<String, PdbError> {
    let (num_turn, num_site, num_xform, num_seq) = (0, 0, 0, 0);
    validate(format!(
        "{:<6}    {:>5}{:>5}{:>5}{:>5}{:>5}{:>5}{:>5}{:>5}{:>5}{:>5}{:>5}{:>5}{:10}",
        "MASTER",
        counts.num_remark,
        0,
        counts.num_het,
        counts.num_helix,
        counts.num_sheet,
        num_turn,
        num_site,
        num_xform,
        counts.num_coord,
        counts.num_ter,
        counts.num_conect,
        num_seq,
        ""
    ))
}

pub fn helix(serial: usize, helix: &Helix) -> Result<String, PdbError> {
    validate(format!(
        "{:<6} {:>3} {:>3} {:>3} {:1} {:>4}{:1} {:>3} {:1} {:>4}{:1}{:>2}{:>30} {:>5}    ",
        "HELIX",
        serial,
        helix.helix_id,
        helix.init_res_name,
        text(helix.init_chain_id),
        helix.init_seq_num,
        text(helix.init_i_code),
        helix.end_res_name,
        text(helix.end_chain_id),
        helix.end_seq_num,
        text(helix.end_i_code),
        text(helix.helix_class),
        helix.comment,
        text(helix.length),
    ))
}

fn registration_fields(registration: Option<&Registration>) -> [String; 5] {
    match registration {
        Some(r) => [
            r.atom_name.clone(),
            r.res_name.clone(),
            text(r.chain_id),
            r.res_seq.to_string(),
            text(r.i_code),
        ],
        None => Default::default(),
    }
}

pub fn sheet(sheet: &Sheet) -> Result<String, PdbError> {
    let [cur_atom, cur_res, cur_chain, cur_seq, cur_icode] = registration_fields(sheet.current.as_ref());
    let [prev_atom, prev_res, prev_chain, prev_seq, prev_icode] =
        registration_fields(sheet.previous.as_ref());
    validate(format!(
        "{:<6} {:>3} {:>3}{:>2} {:>3} {:1}{:>4}{:1} {:>3} {:1}{:>4}{:1}{:>2} {:>4}{:>3} {:1}{:>4}{:1} {:>4}{:>3} {:1}{:>4}{:1}{:10}",
        "SHEET",
        sheet.strand,
        sheet.sheet_id,
        sheet.num_strands,
        sheet.init_res_name,
        text(sheet.init_chain_id),
        sheet.init_seq_num,
        text(sheet.init_i_code),
        sheet.end_res_name,
        text(sheet.end_chain_id),
        sheet.end_seq_num,
        text(sheet.end_i_code),
        sheet.sense,
        cur_atom,
        cur_res,
        cur_chain,
        cur_seq,
        cur_icode,
        prev_atom,
        prev_res,
        prev_chain,
        prev_seq,
        prev_icode,
        ""
    ))
}

pub fn het(
    het_id: &str,
    chain_id: Option<char>,
    seq_num: Option<i32>,
    num_het_atoms: usize,
) -> Result<String, PdbError> {
    validate(format!(
        "{:<6} {:>3}  {:1}{:>4}{:1}  {:>5}     {:<40}{:10}",
        "HET",
        het_id,
        text(chain_id),
        text(seq_num),
        "",
        num_het_atoms,
        "",
        ""
    ))
}

pub fn hetnam(het_id: &str, chemical_name: &str) -> Result<String, PdbError> {
    validate(format!(
        "{:<6}  {:>2} {:>3} {:<55}{:10}",
        "HETNAM",
        "",
        het_id,
        chemical_name.to_uppercase(),
        ""
    ))
}

pub fn formul(comp_num: usize, het_id: &str, formula: &str) -> Result<String, PdbError> {
    validate(format!(
        "{:<6}  {:>2}  {:>3} {:>2}{:1}{:<51}{:10}",
        "FORMUL", comp_num, het_id, "", "", formula, ""
    ))
}

/// `REMARK` records for one remark; `None` produces the blank spacer line.
pub fn remark(num: u32, remark: Option<&str>) -> Result<Vec<String>, PdbError> {
    let lines = match remark {
        None => vec![String::new()],
        Some(body) => wrap(body, REMARK_WIDTH),
    };
    lines
        .into_iter()
        .map(|line| {
            validate(format!(
                "{:<6} {:>3} {:<68} ",
                "REMARK",
                num,
                line.to_uppercase()
            ))
        })
        .collect()
}
