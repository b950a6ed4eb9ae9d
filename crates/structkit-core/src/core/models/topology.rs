use super::molecule::Molecule;
use super::structure::StructureError;
use tracing::trace;

/// Backbone bonds within a single residue, by atom name.
const BACKBONE_BONDS: [(&str, &str); 6] = [
    ("N", "HN"),
    ("N", "H"),
    ("N", "CA"),
    ("CA", "HA"),
    ("CA", "C"),
    ("C", "O"),
];

/// Default search radius, in Angstroms, used when bonds have to be guessed.
pub const DEFAULT_BOND_RADIUS: f64 = 2.0;

/// The maximum number of bonds an atom of the given element is allowed to receive from a
/// distance search.
pub fn max_connections(element: Option<&str>) -> usize {
    match element.map(str::to_ascii_uppercase).as_deref() {
        Some("H") => 1,
        Some("O") => 2,
        Some("N") => 3,
        Some("C") => 4,
        _ => usize::MAX,
    }
}

/// Connects an atom to its nearest neighbours within `radius`.
///
/// Hydrogen-hydrogen pairs are never bonded, and the number of new bonds is capped by the
/// valence of the atom's element. Returns the number of neighbours connected.
pub fn find_bonded_atoms(
    molecule: &mut Molecule,
    index: usize,
    radius: f64,
) -> Result<usize, StructureError> {
    let atom = molecule
        .atom(index)
        .ok_or(StructureError::AtomIndexOutOfRange {
            index,
            len: molecule.len(),
        })?
        .clone();

    let mut neighbours: Vec<(f64, usize)> = molecule
        .atoms()
        .iter()
        .enumerate()
        .filter(|(j, other)| *j != index && !(atom.is_hydrogen() && other.is_hydrogen()))
        .map(|(j, other)| ((other.position - atom.position).norm(), j))
        .filter(|(dist, _)| *dist < radius)
        .collect();
    neighbours.sort_by(|a, b| a.0.total_cmp(&b.0));

    let limit = max_connections(atom.element.as_deref());
    let mut connected = 0;
    for (_, j) in neighbours.into_iter().take(limit) {
        molecule.connect(index, j)?;
        connected += 1;
    }
    trace!(index, connected, "Connected atom by distance search.");
    Ok(connected)
}

/// Adds the standard backbone bonds of every residue of a protein molecule.
pub fn protein_connect(molecule: &mut Molecule) -> Result<(), StructureError> {
    for group in molecule.residue_atom_indices() {
        let find = |mol: &Molecule, name: &str| {
            group
                .iter()
                .copied()
                .find(|&i| mol.atoms()[i].name.as_deref() == Some(name))
        };
        for (name1, name2) in BACKBONE_BONDS {
            if let (Some(i), Some(j)) = (find(&*molecule, name1), find(&*molecule, name2)) {
                molecule.connect(i, j)?;
            }
        }
    }
    Ok(())
}
