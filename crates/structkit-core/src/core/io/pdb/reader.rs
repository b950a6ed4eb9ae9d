use super::{PdbError, PdbFile, PdbParseErrorKind, RECORD_WIDTH};
use crate::core::io::containers::{ParsedFile, ParsedModel, ParsedMolecule, ReadOptions};
use crate::core::io::traits::StructureReader;
use crate::core::models::atom::{Atom, PdbRecord};
use crate::core::models::molecule::Molecule;
use crate::core::models::secondary::{Helix, Registration, Sheet};
use crate::core::utils::identifiers::{element_from_atom_name, index_for_chain_id};
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::BufRead;
use std::str::FromStr;
use tracing::{debug, warn};

type Record<'a> = (usize, &'a str);

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn optional_string(line: &str, start: usize, end: usize) -> Option<String> {
    let value = slice_and_trim(line, start, end);
    (!value.is_empty()).then(|| value.to_string())
}

fn optional_char(line: &str, column: usize) -> Option<char> {
    line.get(column..column + 1)
        .and_then(|s| s.chars().next())
        .filter(|c| !c.is_whitespace())
}

fn columns(start: usize, end: usize) -> String {
    format!("{}-{}", start + 1, end)
}

fn parse_int<T: FromStr>(
    line: &str,
    start: usize,
    end: usize,
    line_num: usize,
) -> Result<Option<T>, PdbError> {
    let value = slice_and_trim(line, start, end);
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: columns(start, end),
            value: value.into(),
        },
    })
}

fn required_int<T: FromStr>(
    line: &str,
    start: usize,
    end: usize,
    line_num: usize,
) -> Result<T, PdbError> {
    parse_int(line, start, end, line_num)?.ok_or_else(|| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: columns(start, end),
            value: String::new(),
        },
    })
}

fn required_float(line: &str, start: usize, end: usize, line_num: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: columns(start, end),
            value: value.into(),
        },
    })
}

fn is_coordinate(line: &str) -> bool {
    line.starts_with("ATOM") || line.starts_with("HETATM")
}

fn parse_helix(line: &str, line_num: usize) -> Result<Helix, PdbError> {
    Ok(Helix {
        helix_id: slice_and_trim(line, 11, 14).to_string(),
        init_res_name: slice_and_trim(line, 15, 18).to_string(),
        init_chain_id: optional_char(line, 19),
        init_seq_num: required_int(line, 21, 25, line_num)?,
        init_i_code: optional_char(line, 25),
        end_res_name: slice_and_trim(line, 27, 30).to_string(),
        end_chain_id: optional_char(line, 31),
        end_seq_num: required_int(line, 33, 37, line_num)?,
        end_i_code: optional_char(line, 37),
        helix_class: parse_int(line, 38, 40, line_num)?,
        comment: slice_and_trim(line, 40, 70).to_string(),
        length: parse_int(line, 71, 76, line_num)?,
    })
}

fn parse_registration(
    line: &str,
    atom: (usize, usize),
    res: (usize, usize),
    chain: usize,
    seq: (usize, usize),
    line_num: usize,
) -> Result<Option<Registration>, PdbError> {
    let Some(res_seq) = parse_int(line, seq.0, seq.1, line_num)? else {
        return Ok(None);
    };
    Ok(Some(Registration {
        atom_name: slice_and_trim(line, atom.0, atom.1).to_string(),
        res_name: slice_and_trim(line, res.0, res.1).to_string(),
        chain_id: optional_char(line, chain),
        res_seq,
        i_code: optional_char(line, seq.1),
    }))
}

fn parse_sheet(line: &str, line_num: usize) -> Result<Sheet, PdbError> {
    Ok(Sheet {
        strand: required_int(line, 7, 10, line_num)?,
        sheet_id: slice_and_trim(line, 11, 14).to_string(),
        num_strands: required_int(line, 14, 16, line_num)?,
        init_res_name: slice_and_trim(line, 17, 20).to_string(),
        init_chain_id: optional_char(line, 21),
        init_seq_num: required_int(line, 22, 26, line_num)?,
        init_i_code: optional_char(line, 26),
        end_res_name: slice_and_trim(line, 28, 31).to_string(),
        end_chain_id: optional_char(line, 32),
        end_seq_num: required_int(line, 33, 37, line_num)?,
        end_i_code: optional_char(line, 37),
        sense: parse_int(line, 38, 40, line_num)?.unwrap_or(0),
        current: parse_registration(line, (41, 45), (45, 48), 49, (50, 54), line_num)?,
        previous: parse_registration(line, (56, 60), (60, 63), 64, (65, 69), line_num)?,
    })
}

/// Secondary structure is kept only when both ends lie in requested molecules.
fn keep_secondary(init: Option<char>, end: Option<char>, options: &ReadOptions) -> bool {
    let mol_num = |chain: Option<char>| chain.and_then(index_for_chain_id).unwrap_or(0) + 1;
    options.wants_mol(mol_num(init)) && options.wants_mol(mol_num(end))
}

struct ModelRecords<'a> {
    number: Option<u32>,
    records: Vec<Record<'a>>,
}

/// Splits the coordinate section into models. `CONECT` records following the last model
/// apply to every model.
fn split_models<'a>(lines: &'a [String], start: usize) -> Result<Vec<ModelRecords<'a>>, PdbError> {
    let mut models = Vec::new();
    let mut trailing_conect = Vec::new();
    let mut number = None;
    let mut records: Vec<Record<'a>> = Vec::new();

    for (i, line) in lines.iter().enumerate().skip(start) {
        let line_num = i + 1;
        if line.starts_with("MODEL") {
            number = Some(
                line.split_whitespace()
                    .nth(1)
                    .and_then(|n| n.parse::<u32>().ok())
                    .ok_or_else(|| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::CorruptModel(line.trim_end().to_string()),
                    })?,
            );
        }
        if records.is_empty() && !is_coordinate(line) {
            if line.starts_with("CONECT") {
                trailing_conect.push((line_num, line.as_str()));
            }
            continue;
        }
        if line.starts_with("ENDMDL") {
            models.push(ModelRecords {
                number,
                records: std::mem::take(&mut records),
            });
            continue;
        }
        records.push((line_num, line.as_str()));
    }
    if !records.is_empty() {
        models.push(ModelRecords { number, records });
    }
    for model in &mut models {
        model.records.extend(trailing_conect.iter().copied());
    }
    Ok(models)
}

struct MoleculeRecords<'a> {
    groups: Vec<(usize, Vec<Record<'a>>)>,
    conect: Vec<Record<'a>>,
}

/// Splits the records of one model into molecules, numbered from 1.
///
/// A new molecule starts after a `TER` not followed by `HETATM` or `CONECT` records and
/// after a `HETATM` followed by an `ATOM`. A chain identifier overrides the running count.
fn split_molecules<'a>(records: &[Record<'a>]) -> MoleculeRecords<'a> {
    let mut mol_count = 1;
    let mut groups: Vec<Vec<Record<'a>>> = vec![Vec::new()];
    let mut conect = Vec::new();

    for (k, &(line_num, line)) in records.iter().enumerate() {
        if line.starts_with("END") || line.starts_with("MASTER") {
            break;
        }
        let next = records.get(k + 1).map(|(_, l)| *l);
        if line.starts_with("TER") {
            if next.is_some_and(|n| !n.starts_with("HETATM") && !n.starts_with("CONECT")) {
                mol_count += 1;
            }
            continue;
        }
        if line.starts_with("CONECT") {
            conect.push((line_num, line));
            continue;
        }
        if !is_coordinate(line) {
            continue;
        }

        let mol_index = optional_char(line, 21)
            .and_then(index_for_chain_id)
            .unwrap_or(mol_count - 1);
        if groups.len() <= mol_index {
            groups.resize_with(mol_index + 1, Vec::new);
        }
        groups[mol_index].push((line_num, line));

        if line.starts_with("HETATM") && next.is_some_and(|n| n.starts_with("ATOM")) {
            mol_count += 1;
        }
    }

    MoleculeRecords {
        groups: groups
            .into_iter()
            .enumerate()
            .filter(|(_, g)| !g.is_empty())
            .map(|(i, g)| (i + 1, g))
            .collect(),
        conect,
    }
}

fn parse_atom(line: &str, line_num: usize) -> Result<Atom, PdbError> {
    let record = if line.starts_with("HETATM") {
        PdbRecord::Hetatm
    } else {
        PdbRecord::Atom
    };
    let position = Point3::new(
        required_float(line, 30, 38, line_num)?,
        required_float(line, 38, 46, line_num)?,
        required_float(line, 46, 54, line_num)?,
    );
    let name = optional_string(line, 12, 16);
    let element = optional_string(line, 76, 78).or_else(|| {
        let guess = name.as_deref().and_then(element_from_atom_name);
        if guess.is_none() {
            warn!(line = line_num, atom = ?name, "Cannot determine the element associated with the atom.");
        }
        guess.map(str::to_string)
    });

    Ok(Atom {
        number: parse_int(line, 6, 11, line_num)?,
        name,
        res_name: optional_string(line, 17, 20),
        res_num: parse_int(line, 22, 26, line_num)?,
        chain_id: optional_char(line, 21),
        seg_id: optional_string(line, 72, 76),
        element,
        record: Some(record),
        position,
    })
}

fn build_molecule(records: &[Record<'_>], alt_loc: Option<char>) -> Result<Molecule, PdbError> {
    let mut molecule = Molecule::new(None);
    for &(line_num, line) in records {
        if let Some(found) = optional_char(line, 16) {
            match alt_loc {
                None => {
                    return Err(PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::AltLocNotSelected,
                    });
                }
                Some(wanted) if wanted != found => continue,
                Some(_) => {}
            }
        }
        molecule.add_atom(parse_atom(line, line_num)?);
    }
    Ok(molecule)
}

fn apply_conect(molecules: &mut [ParsedMolecule], conect: &[Record<'_>]) -> Result<(), PdbError> {
    let mut lookup: HashMap<u32, (usize, usize)> = HashMap::new();
    for (m, parsed) in molecules.iter().enumerate() {
        for (i, atom) in parsed.molecule.atoms().iter().enumerate() {
            if let Some(number) = atom.number {
                lookup.entry(number).or_insert((m, i));
            }
        }
    }

    for &(line_num, line) in conect {
        let Some(serial) = parse_int::<u32>(line, 6, 11, line_num)? else {
            continue;
        };
        for (start, end) in [(11, 16), (16, 21), (21, 26), (26, 31)] {
            let Some(bonded) = parse_int::<u32>(line, start, end, line_num)? else {
                continue;
            };
            match (lookup.get(&serial), lookup.get(&bonded)) {
                (Some(&(m1, i1)), Some(&(m2, i2))) if m1 == m2 => {
                    molecules[m1].molecule.connect(i1, i2)?;
                }
                _ => {
                    warn!(
                        line = line_num,
                        serial, bonded, "Skipping CONECT reference to atoms outside a single loaded molecule."
                    );
                }
            }
        }
    }
    Ok(())
}

impl StructureReader for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead, options: &ReadOptions) -> Result<ParsedFile, PdbError> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            lines.push(format!("{:<width$}", line.trim_end_matches('\r'), width = RECORD_WIDTH));
        }
        if lines.is_empty() {
            return Err(PdbError::Empty);
        }

        let mut parsed = ParsedFile::default();
        let coord_start = lines
            .iter()
            .position(|l| l.starts_with("MODEL") || is_coordinate(l))
            .unwrap_or(lines.len());

        for (i, line) in lines[..coord_start].iter().enumerate() {
            if line.starts_with("HELIX") {
                let helix = parse_helix(line, i + 1)?;
                if keep_secondary(helix.init_chain_id, helix.end_chain_id, options) {
                    parsed.helices.push(helix);
                }
            } else if line.starts_with("SHEET") {
                let sheet = parse_sheet(line, i + 1)?;
                if keep_secondary(sheet.init_chain_id, sheet.end_chain_id, options) {
                    parsed.sheets.push(sheet);
                }
            }
        }

        for model in split_models(&lines, coord_start)? {
            if !options.wants_model(model.number.unwrap_or(1)) {
                continue;
            }
            let split = split_molecules(&model.records);
            let mut molecules = Vec::new();
            for (file_mol_num, records) in split.groups {
                if !options.wants_mol(file_mol_num) {
                    continue;
                }
                molecules.push(ParsedMolecule {
                    file_mol_num,
                    molecule: build_molecule(&records, options.alt_loc)?,
                });
            }
            apply_conect(&mut molecules, &split.conect)?;
            parsed.models.push(ParsedModel {
                number: model.number,
                molecules,
            });
        }

        debug!(
            models = parsed.models.len(),
            helices = parsed.helices.len(),
            sheets = parsed.sheets.len(),
            "Parsed PDB file."
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::records::{self, CoordinateFields};
    use std::io::Cursor;

    fn coord(hetero: bool, serial: u32, name: &str, res: &str, chain: char, res_seq: i32, x: f64) -> String {
        let fields = CoordinateFields {
            serial,
            name,
            alt_loc: None,
            res_name: Some(res),
            chain_id: Some(chain),
            res_seq: Some(res_seq),
            i_code: None,
            position: Point3::new(x, 0.0, 0.0),
            occupancy: 1.0,
            temp_factor: 0.0,
            element: None,
            charge: None,
        };
        if hetero {
            records::hetatm(&fields).unwrap()
        } else {
            records::atom(&fields).unwrap()
        }
    }

    fn model_block(number: u32, shift: f64) -> Vec<String> {
        vec![
            format!("MODEL     {number:>4}"),
            coord(false, 1, "N", "GLY", 'A', 1, 0.0 + shift),
            coord(false, 2, "CA", "GLY", 'A', 1, 1.5 + shift),
            coord(false, 3, "C", "GLY", 'A', 1, 2.5 + shift),
            "TER       4      GLY A   1".to_string(),
            coord(true, 5, "O", "HOH", 'B', 100, 9.0 + shift),
            "ENDMDL".to_string(),
        ]
    }

    fn read(text: &str, options: &ReadOptions) -> Result<ParsedFile, PdbError> {
        PdbFile::read_from(&mut Cursor::new(text.as_bytes()), options)
    }

    fn create_ensemble_text() -> String {
        let mut lines = vec![
            "HEADER    TEST".to_string(),
            records::helix(
                1,
                &Helix {
                    helix_id: "H1".into(),
                    init_res_name: "GLY".into(),
                    init_chain_id: Some('A'),
                    init_seq_num: 1,
                    init_i_code: None,
                    end_res_name: "GLY".into(),
                    end_chain_id: Some('A'),
                    end_seq_num: 1,
                    end_i_code: None,
                    helix_class: Some(1),
                    comment: String::new(),
                    length: Some(1),
                },
            )
            .unwrap(),
        ];
        lines.extend(model_block(1, 0.0));
        lines.extend(model_block(2, 1.0));
        lines.push("CONECT    1    2".to_string());
        lines.push("CONECT    2    1    3".to_string());
        lines.push("END".to_string());
        lines.join("\n")
    }

    #[test]
    fn reads_models_molecules_and_secondary_structure() {
        let parsed = read(&create_ensemble_text(), &ReadOptions::default()).unwrap();

        assert_eq!(parsed.models.len(), 2);
        assert_eq!(parsed.models[1].number, Some(2));
        let molecules = &parsed.models[0].molecules;
        assert_eq!(molecules.len(), 2);
        assert_eq!(molecules[0].file_mol_num, 1);
        assert_eq!(molecules[1].file_mol_num, 2);
        assert_eq!(molecules[0].molecule.len(), 3);

        let ca = &molecules[0].molecule.atoms()[1];
        assert_eq!(ca.name.as_deref(), Some("CA"));
        assert_eq!(ca.element.as_deref(), Some("C"));
        assert_eq!(ca.res_num, Some(1));
        assert_eq!(ca.chain_id, Some('A'));
        assert!(molecules[1].molecule.atoms()[0].is_hetatm());

        assert_eq!(parsed.helices.len(), 1);
        assert_eq!(parsed.helices[0].helix_id, "H1");
        assert_eq!(parsed.helices[0].length, Some(1));
    }

    #[test]
    fn trailing_conect_records_apply_to_every_model() {
        let parsed = read(&create_ensemble_text(), &ReadOptions::default()).unwrap();
        for model in &parsed.models {
            let mol = &model.molecules[0].molecule;
            assert!(mol.are_bonded(0, 1));
            assert!(mol.are_bonded(1, 2));
            assert_eq!(mol.num_bonds(), 2);
        }
    }

    #[test]
    fn model_and_molecule_filters() {
        let options = ReadOptions {
            read_model: Some(vec![2]),
            read_mol: Some(vec![2]),
            alt_loc: None,
        };
        let parsed = read(&create_ensemble_text(), &options).unwrap();
        assert_eq!(parsed.models.len(), 1);
        assert_eq!(parsed.models[0].number, Some(2));
        assert_eq!(parsed.models[0].molecules.len(), 1);
        assert_eq!(parsed.models[0].molecules[0].file_mol_num, 2);
        assert!(parsed.helices.is_empty());
    }

    #[test]
    fn ter_and_hetatm_boundaries_split_unchained_molecules() {
        let mut lines = Vec::new();
        for line in [
            coord(false, 1, "N", "GLY", ' ', 1, 0.0),
            "TER".to_string(),
            coord(false, 2, "N", "ALA", ' ', 1, 3.0),
            coord(true, 3, "O", "HOH", ' ', 2, 6.0),
            coord(false, 4, "N", "SER", ' ', 1, 9.0),
        ] {
            lines.push(line);
        }
        let parsed = read(&lines.join("\n"), &ReadOptions::default()).unwrap();
        let nums: Vec<_> = parsed.models[0]
            .molecules
            .iter()
            .map(|m| (m.file_mol_num, m.molecule.len()))
            .collect();
        assert_eq!(nums, vec![(1, 1), (2, 2), (3, 1)]);
        assert!(parsed.models[0].number.is_none());
    }

    #[test]
    fn alternate_locations_need_a_selection() {
        let mut first = coord(false, 1, "N", "GLY", 'A', 1, 0.0);
        first.replace_range(16..17, "A");
        let mut second = coord(false, 2, "N", "GLY", 'A', 1, 0.5);
        second.replace_range(16..17, "B");
        let text = [first, second].join("\n");

        let err = read(&text, &ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::AltLocNotSelected
            }
        ));

        let options = ReadOptions {
            alt_loc: Some('B'),
            ..ReadOptions::default()
        };
        let parsed = read(&text, &options).unwrap();
        let atoms = parsed.models[0].molecules[0].molecule.atoms();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].position.x, 0.5);
    }

    #[test]
    fn corrupt_records_are_reported_with_line_numbers() {
        let err = read("MODEL     X\n", &ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::CorruptModel(_)
            }
        ));

        let mut bad = coord(false, 1, "N", "GLY", 'A', 1, 0.0);
        bad.replace_range(30..38, "  abc.de");
        let err = read(&bad, &ReadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::InvalidFloat { .. }
            }
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(read("", &ReadOptions::default()), Err(PdbError::Empty)));
    }

    #[test]
    fn sheet_records_are_parsed_with_registration() {
        let sheet = Sheet {
            strand: 2,
            sheet_id: "S1".into(),
            num_strands: 2,
            init_res_name: "VAL".into(),
            init_chain_id: Some('A'),
            init_seq_num: 20,
            init_i_code: None,
            end_res_name: "ILE".into(),
            end_chain_id: Some('A'),
            end_seq_num: 25,
            end_i_code: None,
            sense: -1,
            current: Some(Registration {
                atom_name: "N".into(),
                res_name: "VAL".into(),
                chain_id: Some('A'),
                res_seq: 21,
                i_code: None,
            }),
            previous: Some(Registration {
                atom_name: "O".into(),
                res_name: "THR".into(),
                chain_id: Some('A'),
                res_seq: 4,
                i_code: None,
            }),
        };
        let line = records::sheet(&sheet).unwrap();
        assert_eq!(parse_sheet(&line, 1).unwrap(), sheet);
    }
}
