use super::records::{self, CoordinateFields, MasterCounts};
use super::{PdbError, PdbFile};
use crate::core::io::traits::StructureWriter;
use crate::core::models::atom::{Atom, PdbRecord};
use crate::core::models::model::Model;
use crate::core::models::structure::{Structure, StructureError};
use crate::core::utils::identifiers::{chain_id_for_index, het_chemical_name};
use std::io::Write;
use tracing::debug;

const FORMAT_REMARK: &str = "This file complies with format v. 3.30, Jul-2011.";

/// Output settings for [`PdbFile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdbWriteOptions {
    /// Write only this model.
    pub model: Option<u32>,
    /// Recorded in a `REMARK  40` line when set.
    pub program_version: Option<String>,
    /// A human-readable creation time, recorded in a `REMARK  40` line when set.
    pub created_on: Option<String>,
}

/// One heterogen residue of the `HET` section.
#[derive(Debug, Clone, PartialEq)]
struct HetResidue {
    res_name: String,
    chain_id: Option<char>,
    res_num: Option<i32>,
    num_atoms: usize,
    /// Element counts in order of first appearance.
    elements: Vec<(String, usize)>,
}

impl HetResidue {
    fn formula(&self) -> String {
        self.elements
            .iter()
            .map(|(element, count)| format!("{element}{count}"))
            .collect()
    }
}

fn het_residues(model: &Model) -> Vec<HetResidue> {
    let mut residues: Vec<HetResidue> = Vec::new();
    for (mol_index, molecule) in model.molecules().iter().enumerate() {
        let chain_id = chain_id_for_index(mol_index);
        let mut current: Option<HetResidue> = None;
        let mut finished = Vec::new();

        for atom in molecule.atoms() {
            let Some(res_name) = atom.res_name.as_deref() else {
                continue;
            };
            if !atom.is_hetatm() || res_name == "HOH" {
                continue;
            }
            if current.as_ref().is_none_or(|r| r.res_num != atom.res_num) {
                finished.extend(current.take());
                current = Some(HetResidue {
                    res_name: res_name.to_string(),
                    chain_id,
                    res_num: atom.res_num,
                    num_atoms: 0,
                    elements: Vec::new(),
                });
            }
            if let Some(residue) = current.as_mut() {
                residue.num_atoms += 1;
                if let Some(element) = atom.element.as_deref() {
                    match residue.elements.iter_mut().find(|(e, _)| e == element) {
                        Some((_, count)) => *count += 1,
                        None => residue.elements.push((element.to_string(), 1)),
                    }
                }
            }
        }
        finished.extend(current);

        for residue in finished {
            let duplicate = residues
                .iter()
                .any(|r| r.res_num == residue.res_num && r.chain_id == residue.chain_id);
            if !duplicate {
                residues.push(residue);
            }
        }
    }
    residues
}

fn remarks(options: &PdbWriteOptions) -> Result<Vec<String>, PdbError> {
    let mut lines = records::remark(4, Some(FORMAT_REMARK))?;
    lines.extend(records::remark(40, None)?);
    lines.extend(records::remark(40, Some("Created using structkit."))?);
    lines.extend(records::remark(40, None)?);
    if let Some(version) = &options.program_version {
        lines.extend(records::remark(40, Some(&format!("structkit version {version}.")))?);
    }
    if let Some(created_on) = &options.created_on {
        lines.extend(records::remark(40, Some(&format!("Created on {created_on}.")))?);
    }
    Ok(lines)
}

fn coordinate_fields(atom: &Atom, serial: u32, chain_id: Option<char>) -> CoordinateFields<'_> {
    CoordinateFields {
        serial,
        name: atom.name.as_deref().unwrap_or(""),
        alt_loc: None,
        res_name: atom.res_name.as_deref(),
        chain_id,
        res_seq: atom.res_num,
        i_code: None,
        position: atom.position,
        occupancy: 1.0,
        temp_factor: 0.0,
        element: atom.element.as_deref(),
        charge: None,
    }
}

/// The records of one model, plus the serial assigned to every atom.
struct ModelRecords {
    lines: Vec<String>,
    /// Indexed by molecule, then atom.
    serials: Vec<Vec<u32>>,
    num_coord: usize,
    num_ter: usize,
}

fn model_records(model: &Model) -> Result<ModelRecords, PdbError> {
    let mut lines = Vec::new();
    let mut serials = Vec::with_capacity(model.num_molecules());
    let mut serial = 0u32;
    let (mut num_coord, mut num_ter) = (0, 0);

    for (mol_index, molecule) in model.molecules().iter().enumerate() {
        let chain_id = chain_id_for_index(mol_index);
        let mut mol_serials = vec![0; molecule.len()];
        let mut last_atom: Option<&Atom> = None;

        for (i, atom) in molecule.atoms().iter().enumerate() {
            if atom.record.is_some_and(|r| r != PdbRecord::Atom) {
                continue;
            }
            serial += 1;
            mol_serials[i] = serial;
            lines.push(records::atom(&coordinate_fields(atom, serial, chain_id))?);
            num_coord += 1;
            last_atom = Some(atom);
        }

        if let Some(atom) = last_atom {
            serial += 1;
            lines.push(records::ter(serial, atom.res_name.as_deref(), chain_id, atom.res_num)?);
            num_ter += 1;
        }

        for (i, atom) in molecule.atoms().iter().enumerate() {
            if !atom.is_hetatm() {
                continue;
            }
            serial += 1;
            mol_serials[i] = serial;
            lines.push(records::hetatm(&coordinate_fields(atom, serial, chain_id))?);
            num_coord += 1;
        }
        serials.push(mol_serials);
    }

    Ok(ModelRecords {
        lines,
        serials,
        num_coord,
        num_ter,
    })
}

/// `CONECT` records for every bonded atom, at most four partners per record.
fn conect_records(model: &Model, serials: &[Vec<u32>]) -> Result<Vec<String>, PdbError> {
    let mut lines = Vec::new();
    for (molecule, mol_serials) in model.molecules().iter().zip(serials) {
        for (i, &serial) in mol_serials.iter().enumerate() {
            let bonded: Vec<u32> = molecule.bonded(i).iter().map(|&j| mol_serials[j]).collect();
            for chunk in bonded.chunks(4) {
                lines.push(records::conect(serial, chunk)?);
            }
        }
    }
    Ok(lines)
}

impl StructureWriter for PdbFile {
    type Options = PdbWriteOptions;
    type Error = PdbError;

    /// Writes the models chosen by `options.model`.
    ///
    /// HET, HETNAM, FORMUL and CONECT records come from the first written model, not
    /// necessarily the first model of the structure. CONECT serials must match the atoms
    /// actually written, and the models are validated to hold the same molecules.
    fn write_to(
        structure: &Structure,
        options: &PdbWriteOptions,
        writer: &mut impl Write,
    ) -> Result<(), PdbError> {
        structure.validate()?;
        let models = structure.model_loop(options.model);
        if let (Some(number), true) = (options.model, models.is_empty()) {
            return Err(StructureError::ModelNotFound(number).into());
        }
        let model_records_needed = structure.models().iter().any(|m| m.number.is_some());
        let mut counts = MasterCounts::default();

        let remarks = remarks(options)?;
        counts.num_remark = remarks.len();
        for line in &remarks {
            writeln!(writer, "{line}")?;
        }

        let het = models.first().map(|m| het_residues(m)).unwrap_or_default();
        counts.num_het = het.len();
        for residue in &het {
            writeln!(
                writer,
                "{}",
                records::het(&residue.res_name, residue.chain_id, residue.res_num, residue.num_atoms)?
            )?;
        }
        let mut unique: Vec<&HetResidue> = Vec::new();
        for residue in &het {
            if !unique.iter().any(|r| r.res_name == residue.res_name) {
                unique.push(residue);
            }
        }
        for residue in &unique {
            let name = het_chemical_name(&residue.res_name).unwrap_or("Unknown");
            writeln!(writer, "{}", records::hetnam(&residue.res_name, name)?)?;
        }
        for (i, residue) in unique.iter().enumerate() {
            writeln!(
                writer,
                "{}",
                records::formul(i + 1, &residue.res_name, &residue.formula())?
            )?;
        }

        counts.num_helix = structure.helices().len();
        for (i, helix) in structure.helices().iter().enumerate() {
            writeln!(writer, "{}", records::helix(i + 1, helix)?)?;
        }
        counts.num_sheet = structure.sheets().len();
        for sheet in structure.sheets() {
            writeln!(writer, "{}", records::sheet(sheet)?)?;
        }

        let mut first_serials: Option<Vec<Vec<u32>>> = None;
        for (position, model) in models.iter().enumerate() {
            if model_records_needed {
                let number = model.number.unwrap_or(position as u32 + 1);
                writeln!(writer, "{}", records::model(number)?)?;
            }
            let written = model_records(model)?;
            for line in &written.lines {
                writeln!(writer, "{line}")?;
            }
            counts.num_coord += written.num_coord;
            counts.num_ter += written.num_ter;
            if model_records_needed {
                writeln!(writer, "{}", records::endmdl())?;
            }
            first_serials.get_or_insert(written.serials);
        }

        if let (Some(model), Some(serials)) = (models.first(), first_serials.as_ref()) {
            let conect = conect_records(model, serials)?;
            counts.num_conect = conect.len();
            for line in &conect {
                writeln!(writer, "{line}")?;
            }
        }

        writeln!(writer, "{}", records::master(&counts)?)?;
        writeln!(writer, "{}", records::end())?;

        debug!(
            models = models.len(),
            coordinates = counts.num_coord,
            conect = counts.num_conect,
            "Wrote PDB data."
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::containers::ReadOptions;
    use crate::core::io::traits::StructureReader;
    use crate::core::models::molecule::Molecule;
    use crate::core::models::secondary::Helix;
    use nalgebra::Point3;
    use std::io::Cursor;

    fn protein(shift: f64) -> Molecule {
        let mut mol = Molecule::new(Some("prot"));
        for (i, name) in ["N", "CA", "C"].iter().enumerate() {
            mol.add_atom(
                Atom::new(Point3::new(i as f64 * 1.5 + shift, 0.0, 0.0))
                    .with_number(i as u32 + 1)
                    .with_name(name)
                    .with_residue(1, "GLY")
                    .with_element(&name[..1])
                    .with_record(PdbRecord::Atom),
            );
        }
        mol.add_atom(
            Atom::new(Point3::new(shift, 5.0, 0.0))
                .with_name("C1")
                .with_residue(900, "PIV")
                .with_element("C")
                .with_record(PdbRecord::Hetatm),
        );
        mol.connect(0, 1).unwrap();
        mol.connect(1, 2).unwrap();
        mol.connect(2, 3).unwrap();
        mol
    }

    fn waters() -> Molecule {
        let mut mol = Molecule::new(Some("solvent"));
        mol.add_atom(
            Atom::new(Point3::new(0.0, 0.0, 9.0))
                .with_name("O")
                .with_residue(1, "HOH")
                .with_element("O")
                .with_record(PdbRecord::Hetatm),
        );
        mol
    }

    fn create_ensemble() -> Structure {
        let mut structure = Structure::new();
        structure
            .pack(
                vec![
                    (Some(1), vec![protein(0.0), waters()]),
                    (Some(2), vec![protein(1.0), waters()]),
                ],
                false,
            )
            .unwrap();
        structure.add_helix(Helix {
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
        });
        structure
    }

    fn write(structure: &Structure, options: &PdbWriteOptions) -> Vec<String> {
        let mut buffer = Vec::new();
        PdbFile::write_to(structure, options, &mut buffer).unwrap();
        String::from_utf8(buffer)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn records_of<'a>(lines: &'a [String], record: &str) -> Vec<&'a String> {
        lines.iter().filter(|l| l[..6].trim_end() == record).collect()
    }

    #[test]
    fn every_record_is_eighty_characters() {
        let options = PdbWriteOptions {
            program_version: Some("0.1.0".into()),
            created_on: Some("Mon Oct 19 10:00:00 2026".into()),
            ..PdbWriteOptions::default()
        };
        for line in write(&create_ensemble(), &options) {
            assert_eq!(line.chars().count(), 80, "bad record: '{line}'");
        }
    }

    #[test]
    fn records_appear_in_section_order() {
        let lines = write(&create_ensemble(), &PdbWriteOptions::default());
        let order: Vec<&str> = lines.iter().map(|l| l[..6].trim_end()).collect();
        let first = |record: &str| order.iter().position(|r| *r == record).unwrap();

        assert_eq!(order[0], "REMARK");
        assert!(first("HET") < first("HETNAM"));
        assert!(first("HETNAM") < first("FORMUL"));
        assert!(first("FORMUL") < first("HELIX"));
        assert!(first("HELIX") < first("MODEL"));
        assert!(first("ENDMDL") < first("CONECT"));
        assert_eq!(order[order.len() - 2], "MASTER");
        assert_eq!(order[order.len() - 1], "END");
        assert_eq!(records_of(&lines, "MODEL").len(), 2);
    }

    #[test]
    fn het_section_skips_water() {
        let lines = write(&create_ensemble(), &PdbWriteOptions::default());
        let het = records_of(&lines, "HET");
        assert_eq!(het.len(), 1);
        assert_eq!(&het[0][7..10], "PIV");
        assert_eq!(&het[0][12..13], "A");
        assert_eq!(het[0][13..17].trim(), "900");
        assert_eq!(het[0][20..25].trim(), "1");
        assert!(records_of(&lines, "HETNAM")[0].contains("PIVOT POINT"));
        assert_eq!(records_of(&lines, "FORMUL")[0][18..].trim(), "C1");
    }

    #[test]
    fn ter_follows_atoms_and_conect_uses_written_serials() {
        let lines = write(&create_ensemble(), &PdbWriteOptions::default());
        let model_end = lines.iter().position(|l| l.starts_with("ENDMDL")).unwrap();
        let coords: Vec<&str> = lines[..model_end]
            .iter()
            .filter(|l| l.starts_with("ATOM") || l.starts_with("TER") || l.starts_with("HETATM"))
            .map(|l| l[..11].trim_end())
            .collect();
        assert_eq!(
            coords,
            vec!["ATOM      1", "ATOM      2", "ATOM      3", "TER       4", "HETATM    5", "HETATM    6"]
        );

        let conect = records_of(&lines, "CONECT");
        assert_eq!(conect.len(), 4);
        let pivot_bond = conect.iter().find(|l| l[6..11].trim() == "5").unwrap();
        assert_eq!(pivot_bond[11..16].trim(), "3");
        let master = records_of(&lines, "MASTER")[0];
        let field = |n: usize| master[10 + 5 * n..15 + 5 * n].trim().to_string();
        assert_eq!(field(2), "1");
        assert_eq!(field(3), "1");
        assert_eq!(field(8), "10");
        assert_eq!(field(9), "2");
        assert_eq!(field(10), "4");
    }

    #[test]
    fn a_single_model_can_be_selected() {
        let options = PdbWriteOptions {
            model: Some(2),
            ..PdbWriteOptions::default()
        };
        let lines = write(&create_ensemble(), &options);
        let models = records_of(&lines, "MODEL");
        assert_eq!(models.len(), 1);
        assert_eq!(models[0][10..14].trim(), "2");

        let mut buffer = Vec::new();
        let missing = PdbWriteOptions {
            model: Some(7),
            ..PdbWriteOptions::default()
        };
        assert!(matches!(
            PdbFile::write_to(&create_ensemble(), &missing, &mut buffer),
            Err(PdbError::Structure(StructureError::ModelNotFound(7)))
        ));
    }

    #[test]
    fn unnumbered_structures_have_no_model_records() {
        let mut structure = Structure::new();
        structure.pack(vec![(None, vec![protein(0.0)])], false).unwrap();
        let lines = write(&structure, &PdbWriteOptions::default());
        assert!(records_of(&lines, "MODEL").is_empty());
        assert!(records_of(&lines, "ENDMDL").is_empty());
    }

    #[test]
    fn written_files_read_back_with_bonds() {
        let mut buffer = Vec::new();
        PdbFile::write_to(&create_ensemble(), &PdbWriteOptions::default(), &mut buffer).unwrap();
        let parsed = PdbFile::read_from(&mut Cursor::new(buffer), &ReadOptions::default()).unwrap();

        assert_eq!(parsed.models.len(), 2);
        assert_eq!(parsed.helices.len(), 1);
        let molecules = &parsed.models[0].molecules;
        assert_eq!(molecules.len(), 2);
        let prot = &molecules[0].molecule;
        assert_eq!(prot.len(), 4);
        assert!(prot.are_bonded(2, 3));
        assert_eq!(prot.num_bonds(), 3);
        assert_eq!(parsed.models[1].molecules[0].molecule.atoms()[0].position.x, 1.0);
    }
}
