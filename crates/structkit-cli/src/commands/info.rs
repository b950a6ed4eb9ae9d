use super::load_structure;
use crate::cli::InfoArgs;
use crate::error::Result;
use std::fmt::Write as _;
use structkit::core::models::molecule::MoleculeKind;
use structkit::core::models::structure::Structure;
use tracing::info;

fn model_label(number: Option<u32>) -> String {
    number.map_or_else(|| "-".to_string(), |n| n.to_string())
}

/// A plain-text overview of `structure`.
pub fn summarise(structure: &Structure) -> String {
    let mut out = String::new();
    let numbers: Vec<String> = structure.model_list().into_iter().map(model_label).collect();
    let _ = writeln!(out, "Models: {} [{}]", structure.num_models(), numbers.join(", "));

    let Some(first) = structure.first_model() else {
        return out;
    };
    let _ = writeln!(out, "Molecules: {}", first.num_molecules());
    for (index, molecule) in first.molecules().iter().enumerate() {
        let name = molecule.name().unwrap_or("(unnamed)");
        let _ = writeln!(
            out,
            "  {:>3}  {:<16} {:>6} atoms {:>5} residues {:>5} bonds",
            index + 1,
            name,
            molecule.len(),
            molecule.residues().len(),
            molecule.num_bonds()
        );
        if molecule.kind() == MoleculeKind::Protein {
            if let Some(sequence) = molecule
                .name()
                .and_then(|n| structure.one_letter_codes(n).ok())
            {
                let _ = writeln!(out, "       sequence: {sequence}");
            }
        }
    }

    let _ = writeln!(out, "Helices: {}", structure.helices().len());
    for helix in structure.helices() {
        let _ = writeln!(
            out,
            "  {:<3} {} {}{} - {} {}{}",
            helix.helix_id,
            helix.init_chain_id.unwrap_or(' '),
            helix.init_res_name,
            helix.init_seq_num,
            helix.end_chain_id.unwrap_or(' '),
            helix.end_res_name,
            helix.end_seq_num
        );
    }
    let _ = writeln!(out, "Sheet strands: {}", structure.sheets().len());
    out
}

pub fn run(args: InfoArgs) -> Result<()> {
    let structure = load_structure(&args.input, &args.read)?;
    info!(models = structure.num_models(), "Structure loaded.");
    print!("{}", summarise(&structure));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use structkit::core::models::atom::Atom;
    use structkit::core::models::molecule::Molecule;

    fn peptide() -> Molecule {
        let mut mol = Molecule::new(Some("pep"));
        for (i, res) in ["ALA", "GLY", "TRP"].iter().enumerate() {
            mol.add_atom(
                Atom::new(Point3::new(i as f64 * 3.8, 0.0, 0.0))
                    .with_number(i as u32 + 1)
                    .with_name("CA")
                    .with_residue(i as i32 + 1, res),
            );
        }
        mol
    }

    #[test]
    fn summary_lists_models_molecules_and_sequences() {
        let mut structure = Structure::new();
        structure
            .pack(vec![(Some(1), vec![peptide()]), (Some(2), vec![peptide()])], false)
            .unwrap();

        let summary = summarise(&structure);
        assert!(summary.contains("Models: 2 [1, 2]"));
        assert!(summary.contains("Molecules: 1"));
        assert!(summary.contains("pep"));
        assert!(summary.contains("sequence: AGW"));
        assert!(summary.contains("Helices: 0"));
    }

    #[test]
    fn an_empty_structure_only_reports_its_models() {
        assert_eq!(summarise(&Structure::new()), "Models: 0 []\n");
    }
}
