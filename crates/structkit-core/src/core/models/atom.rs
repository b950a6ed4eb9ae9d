use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;

/// The PDB coordinate record an atom is written as.
///
/// Atoms without an explicit record are treated as `ATOM` records on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PdbRecord {
    /// A standard polymer atom (`ATOM`).
    Atom,
    /// A heterogen atom (`HETATM`), such as a ligand, water or pseudo-atom.
    Hetatm,
}

impl fmt::Display for PdbRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom => write!(f, "ATOM"),
            Self::Hetatm => write!(f, "HETATM"),
        }
    }
}

impl FromStr for PdbRecord {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ATOM" => Ok(Self::Atom),
            "HETATM" => Ok(Self::Hetatm),
            _ => Err(()),
        }
    }
}

/// A single atom of a molecule within one model.
///
/// Every descriptive field is optional because the supported formats carry very
/// different amounts of information: a PDB atom has all of them, while an atom read from
/// an XYZ file only knows its element and position.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The atom serial number. Renumbered sequentially when written.
    pub number: Option<u32>,
    /// The atom name (e.g., "CA", "N", "HN").
    pub name: Option<String>,
    /// The three-letter residue name (e.g., "ALA").
    pub res_name: Option<String>,
    /// The residue sequence number.
    pub res_num: Option<i32>,
    /// The chain identifier as read from the source file.
    pub chain_id: Option<char>,
    /// The segment identifier.
    pub seg_id: Option<String>,
    /// The element symbol (e.g., "C", "Fe").
    pub element: Option<String>,
    /// The PDB record type.
    pub record: Option<PdbRecord>,
    /// The Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates an atom at `position` with every descriptive field unset.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            number: None,
            name: None,
            res_name: None,
            res_num: None,
            chain_id: None,
            seg_id: None,
            element: None,
            record: None,
            position,
        }
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_residue(mut self, res_num: i32, res_name: &str) -> Self {
        self.res_num = Some(res_num);
        self.res_name = Some(res_name.to_string());
        self
    }

    pub fn with_chain_id(mut self, chain_id: char) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_seg_id(mut self, seg_id: &str) -> Self {
        self.seg_id = Some(seg_id.to_string());
        self
    }

    pub fn with_element(mut self, element: &str) -> Self {
        self.element = Some(element.to_string());
        self
    }

    pub fn with_record(mut self, record: PdbRecord) -> Self {
        self.record = Some(record);
        self
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element.as_deref() == Some("H")
    }

    pub fn is_hetatm(&self) -> bool {
        self.record == Some(PdbRecord::Hetatm)
    }

    /// Compares everything except the position.
    ///
    /// Two models of one ensemble must agree on this for every atom.
    pub fn same_identity(&self, other: &Atom) -> bool {
        self.number == other.number
            && self.name == other.name
            && self.res_name == other.res_name
            && self.chain_id == other.chain_id
            && self.res_num == other.res_num
            && self.seg_id == other.seg_id
            && self.element == other.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_only_a_position() {
        let atom = Atom::new(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert!(atom.number.is_none());
        assert!(atom.name.is_none());
        assert!(atom.element.is_none());
        assert!(atom.record.is_none());
    }

    #[test]
    fn builder_methods_set_fields() {
        let atom = Atom::new(Point3::origin())
            .with_number(7)
            .with_name("CA")
            .with_residue(12, "GLY")
            .with_chain_id('B')
            .with_element("C")
            .with_record(PdbRecord::Atom);

        assert_eq!(atom.number, Some(7));
        assert_eq!(atom.name.as_deref(), Some("CA"));
        assert_eq!(atom.res_num, Some(12));
        assert_eq!(atom.res_name.as_deref(), Some("GLY"));
        assert_eq!(atom.chain_id, Some('B'));
        assert_eq!(atom.element.as_deref(), Some("C"));
        assert!(!atom.is_hetatm());
    }

    #[test]
    fn same_identity_ignores_position_but_not_names() {
        let a = Atom::new(Point3::origin()).with_name("N").with_number(1);
        let b = Atom::new(Point3::new(5.0, 5.0, 5.0))
            .with_name("N")
            .with_number(1);
        let c = b.clone().with_name("CA");

        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
    }

    #[test]
    fn pdb_record_parses_and_displays() {
        assert_eq!("HETATM".parse::<PdbRecord>(), Ok(PdbRecord::Hetatm));
        assert_eq!("ATOM  ".parse::<PdbRecord>(), Ok(PdbRecord::Atom));
        assert!("REMARK".parse::<PdbRecord>().is_err());
        assert_eq!(PdbRecord::Hetatm.to_string(), "HETATM");
    }
}
