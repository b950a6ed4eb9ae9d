use std::collections::{BTreeMap, BTreeSet};

/// A `HELIX` annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Helix {
    pub helix_id: String,
    pub init_res_name: String,
    pub init_chain_id: Option<char>,
    pub init_seq_num: i32,
    pub init_i_code: Option<char>,
    pub end_res_name: String,
    pub end_chain_id: Option<char>,
    pub end_seq_num: i32,
    pub end_i_code: Option<char>,
    /// The helix class (1 = right-handed alpha, ..., 10 = polyproline).
    pub helix_class: Option<u8>,
    pub comment: String,
    pub length: Option<i32>,
}

/// The registration of a strand against the previous strand of its sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub atom_name: String,
    pub res_name: String,
    pub chain_id: Option<char>,
    pub res_seq: i32,
    pub i_code: Option<char>,
}

/// A `SHEET` annotation, one record per strand.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub strand: u32,
    pub sheet_id: String,
    pub num_strands: u32,
    pub init_res_name: String,
    pub init_chain_id: Option<char>,
    pub init_seq_num: i32,
    pub init_i_code: Option<char>,
    pub end_res_name: String,
    pub end_chain_id: Option<char>,
    pub end_seq_num: i32,
    pub end_i_code: Option<char>,
    /// 0 for the first strand, 1 for parallel and -1 for anti-parallel.
    pub sense: i32,
    pub current: Option<Registration>,
    pub previous: Option<Registration>,
}

/// Shrinks the residue range `[start, end]` past deleted residues at either end.
///
/// Returns `None` when every residue in the range was deleted.
fn trim_range(start: i32, end: i32, deleted: &BTreeSet<i32>) -> Option<(i32, i32)> {
    let mut start = start;
    let mut end = end;
    while start <= end && deleted.contains(&start) {
        start += 1;
    }
    if start > end {
        return None;
    }
    while deleted.contains(&end) {
        end -= 1;
    }
    Some((start, end))
}

fn residue_name(residues: &BTreeMap<i32, String>, res_num: i32, fallback: &str) -> String {
    residues
        .get(&res_num)
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

impl Helix {
    pub fn belongs_to(&self, chain_id: Option<char>) -> bool {
        chain_id.is_none() || self.init_chain_id.is_none() || self.init_chain_id == chain_id
    }

    /// Trims the helix after the residues in `deleted` were removed.
    ///
    /// `residues` maps residue numbers to names as they were before the deletion. Returns
    /// `None` when nothing of the helix survives.
    pub fn trimmed(
        &self,
        deleted: &BTreeSet<i32>,
        residues: &BTreeMap<i32, String>,
    ) -> Option<Helix> {
        let (start, end) = trim_range(self.init_seq_num, self.end_seq_num, deleted)?;
        let mut helix = self.clone();
        if start != self.init_seq_num {
            helix.init_seq_num = start;
            helix.init_res_name = residue_name(residues, start, &self.init_res_name);
            helix.init_i_code = None;
        }
        if end != self.end_seq_num {
            helix.end_seq_num = end;
            helix.end_res_name = residue_name(residues, end, &self.end_res_name);
            helix.end_i_code = None;
        }
        let remaining = (start..=end).filter(|r| !deleted.contains(r)).count();
        helix.length = Some(remaining as i32);
        Some(helix)
    }
}

impl Sheet {
    pub fn belongs_to(&self, chain_id: Option<char>) -> bool {
        chain_id.is_none() || self.init_chain_id.is_none() || self.init_chain_id == chain_id
    }

    /// Trims the strand after the residues in `deleted` were removed.
    ///
    /// Registration data pointing at a deleted residue is dropped.
    pub fn trimmed(
        &self,
        deleted: &BTreeSet<i32>,
        residues: &BTreeMap<i32, String>,
    ) -> Option<Sheet> {
        let (start, end) = trim_range(self.init_seq_num, self.end_seq_num, deleted)?;
        let mut sheet = self.clone();
        if start != self.init_seq_num {
            sheet.init_seq_num = start;
            sheet.init_res_name = residue_name(residues, start, &self.init_res_name);
            sheet.init_i_code = None;
        }
        if end != self.end_seq_num {
            sheet.end_seq_num = end;
            sheet.end_res_name = residue_name(residues, end, &self.end_res_name);
            sheet.end_i_code = None;
        }
        if let Some(current) = &sheet.current {
            if deleted.contains(&current.res_seq) {
                sheet.current = None;
            }
        }
        Some(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residue_map() -> BTreeMap<i32, String> {
        (1..=10)
            .map(|i| (i, if i % 2 == 0 { "ALA" } else { "GLY" }.to_string()))
            .collect()
    }

    fn create_helix(start: i32, end: i32) -> Helix {
        Helix {
            helix_id: "1".into(),
            init_res_name: "GLY".into(),
            init_chain_id: Some('A'),
            init_seq_num: start,
            init_i_code: None,
            end_res_name: "ALA".into(),
            end_chain_id: Some('A'),
            end_seq_num: end,
            end_i_code: None,
            helix_class: Some(1),
            comment: String::new(),
            length: Some(end - start + 1),
        }
    }

    fn create_sheet(start: i32, end: i32) -> Sheet {
        Sheet {
            strand: 1,
            sheet_id: "A".into(),
            num_strands: 2,
            init_res_name: "GLY".into(),
            init_chain_id: Some('A'),
            init_seq_num: start,
            init_i_code: None,
            end_res_name: "ALA".into(),
            end_chain_id: Some('A'),
            end_seq_num: end,
            end_i_code: None,
            sense: 0,
            current: None,
            previous: None,
        }
    }

    #[test]
    fn helix_is_trimmed_at_both_ends() {
        let deleted: BTreeSet<i32> = [1, 2, 5, 8].into_iter().collect();
        let helix = create_helix(1, 8).trimmed(&deleted, &residue_map()).unwrap();

        assert_eq!(helix.init_seq_num, 3);
        assert_eq!(helix.init_res_name, "GLY");
        assert_eq!(helix.end_seq_num, 7);
        assert_eq!(helix.end_res_name, "GLY");
        assert_eq!(helix.length, Some(4));
    }

    #[test]
    fn helix_is_dropped_when_all_residues_are_deleted() {
        let deleted: BTreeSet<i32> = (3..=6).collect();
        assert!(create_helix(3, 6).trimmed(&deleted, &residue_map()).is_none());
    }

    #[test]
    fn untouched_helix_keeps_its_range() {
        let deleted: BTreeSet<i32> = [9].into_iter().collect();
        let helix = create_helix(2, 6).trimmed(&deleted, &residue_map()).unwrap();
        assert_eq!((helix.init_seq_num, helix.end_seq_num), (2, 6));
        assert_eq!(helix.init_res_name, "GLY");
        assert_eq!(helix.length, Some(5));
    }

    #[test]
    fn sheet_is_trimmed_and_registration_dropped() {
        let mut sheet = create_sheet(4, 9);
        sheet.current = Some(Registration {
            atom_name: "N".into(),
            res_name: "ALA".into(),
            chain_id: Some('A'),
            res_seq: 9,
            i_code: None,
        });
        let deleted: BTreeSet<i32> = [9].into_iter().collect();
        let sheet = sheet.trimmed(&deleted, &residue_map()).unwrap();

        assert_eq!(sheet.init_seq_num, 4);
        assert_eq!(sheet.end_seq_num, 8);
        assert_eq!(sheet.end_res_name, "ALA");
        assert!(sheet.current.is_none());
    }

    #[test]
    fn chain_membership_is_lenient_for_missing_ids() {
        let helix = create_helix(1, 4);
        assert!(helix.belongs_to(Some('A')));
        assert!(!helix.belongs_to(Some('B')));
        assert!(helix.belongs_to(None));
    }
}
