use std::fmt;
use std::ops::Deref;

/// One row of a connectivity table: atom `atom_number_i` of the residue at position
/// `residue_index_i` is linked to atom `atom_number_j` of the residue at `residue_index_j`.
///
/// Field order mirrors the six columns of the table exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BondRecord {
    pub residue_index_i: usize,
    pub residue_name_i: String,
    pub residue_index_j: usize,
    pub residue_name_j: String,
    pub atom_number_i: u32,
    pub atom_number_j: u32,
}

impl BondRecord {
    pub fn new(
        residue_index_i: usize,
        residue_name_i: &str,
        residue_index_j: usize,
        residue_name_j: &str,
        atom_number_i: u32,
        atom_number_j: u32,
    ) -> Self {
        Self {
            residue_index_i,
            residue_name_i: residue_name_i.to_string(),
            residue_index_j,
            residue_name_j: residue_name_j.to_string(),
            atom_number_i,
            atom_number_j,
        }
    }

    /// Resolves which residue contributes the carbon and which the oxygen to the new bond.
    ///
    /// The side with the lower atom number is the anomeric carbon donor. When
    /// `atom_number_i > atom_number_j` residue `j` gives the carbon and residue `i` the
    /// oxygen; in every other case, ties included, residue `i` gives the carbon.
    pub fn linkage(&self) -> Linkage {
        let site_i = LinkageSite {
            residue_index: self.residue_index_i,
            position: self.atom_number_i,
        };
        let site_j = LinkageSite {
            residue_index: self.residue_index_j,
            position: self.atom_number_j,
        };
        if self.atom_number_i > self.atom_number_j {
            Linkage {
                carbon: site_j,
                oxygen: site_i,
                carbon_is_i: false,
            }
        } else {
            Linkage {
                carbon: site_i,
                oxygen: site_j,
                carbon_is_i: true,
            }
        }
    }
}

impl fmt::Display for BondRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.residue_index_i,
            self.residue_name_i,
            self.residue_index_j,
            self.residue_name_j,
            self.atom_number_i,
            self.atom_number_j
        )
    }
}

/// A ring position on a specific residue of the oligomer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkageSite {
    pub residue_index: usize,
    pub position: u32,
}

impl LinkageSite {
    pub fn carbon_name(&self) -> String {
        format!("C{}", self.position)
    }

    pub fn oxygen_name(&self) -> String {
        format!("O{}", self.position)
    }

    /// Name of the hydroxyl hydrogen carried by the oxygen at this position, e.g. `H4o`.
    pub fn hydroxyl_hydrogen_name(&self) -> String {
        format!("H{}o", self.position)
    }
}

/// Atoms removed from one residue when a glycosidic bond is condensed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeavingGroup {
    pub residue_index: usize,
    pub atom_names: Vec<String>,
}

/// Oriented view of a [`BondRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linkage {
    /// Anomeric carbon side; loses its hydroxyl oxygen and hydrogen.
    pub carbon: LinkageSite,
    /// Hydroxyl side; loses only its hydroxyl hydrogen and keeps the bridging oxygen.
    pub oxygen: LinkageSite,
    carbon_is_i: bool,
}

impl Linkage {
    /// The hydroxyl oxygen and hydrogen of the carbon side, then the bridging hydrogen of the
    /// oxygen side.
    pub fn leaving_groups(&self) -> [LeavingGroup; 2] {
        [
            LeavingGroup {
                residue_index: self.carbon.residue_index,
                atom_names: vec![
                    self.carbon.oxygen_name(),
                    self.carbon.hydroxyl_hydrogen_name(),
                ],
            },
            LeavingGroup {
                residue_index: self.oxygen.residue_index,
                atom_names: vec![self.oxygen.hydroxyl_hydrogen_name()],
            },
        ]
    }

    /// The two atoms joined by the fuse, residue `i`'s atom first.
    ///
    /// The first atom's structure is the one moved onto, and merged into, the second.
    pub fn fuse_atoms(&self) -> [(usize, String); 2] {
        let carbon = (self.carbon.residue_index, self.carbon.carbon_name());
        let oxygen = (self.oxygen.residue_index, self.oxygen.oxygen_name());
        if self.carbon_is_i {
            [carbon, oxygen]
        } else {
            [oxygen, carbon]
        }
    }
}

/// Monosaccharide names indexed by their position in the oligomer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidueList(Vec<String>);

impl ResidueList {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for ResidueList {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<&str>> for ResidueList {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_atom_number_on_i_makes_i_the_carbon_side() {
        let bond = BondRecord::new(0, "GLC", 1, "GLC", 1, 4);
        let linkage = bond.linkage();

        assert_eq!(linkage.carbon, LinkageSite { residue_index: 0, position: 1 });
        assert_eq!(linkage.oxygen, LinkageSite { residue_index: 1, position: 4 });
        assert_eq!(
            linkage.fuse_atoms(),
            [(0, "C1".to_string()), (1, "O4".to_string())]
        );
    }

    #[test]
    fn higher_atom_number_on_i_makes_j_the_carbon_side() {
        let bond = BondRecord::new(0, "GLC", 1, "GAL", 6, 1);
        let linkage = bond.linkage();

        assert_eq!(linkage.carbon, LinkageSite { residue_index: 1, position: 1 });
        assert_eq!(linkage.oxygen, LinkageSite { residue_index: 0, position: 6 });
        assert_eq!(
            linkage.fuse_atoms(),
            [(0, "O6".to_string()), (1, "C1".to_string())]
        );
    }

    #[test]
    fn equal_atom_numbers_keep_i_as_the_carbon_side() {
        let linkage = BondRecord::new(2, "GLC", 3, "GLC", 1, 1).linkage();
        assert_eq!(linkage.carbon.residue_index, 2);
        assert_eq!(linkage.oxygen.residue_index, 3);
    }

    #[test]
    fn leaving_groups_strip_hydroxyl_from_carbon_side_and_hydrogen_from_oxygen_side() {
        let linkage = BondRecord::new(0, "GLC", 1, "GLC", 1, 4).linkage();
        let [carbon_side, oxygen_side] = linkage.leaving_groups();

        assert_eq!(carbon_side.residue_index, 0);
        assert_eq!(carbon_side.atom_names, vec!["O1", "H1o"]);
        assert_eq!(oxygen_side.residue_index, 1);
        assert_eq!(oxygen_side.atom_names, vec!["H4o"]);
    }

    #[test]
    fn display_renders_table_row() {
        let bond = BondRecord::new(0, "GLC", 1, "MAN", 1, 3);
        assert_eq!(bond.to_string(), "0 GLC 1 MAN 1 3");
    }

    #[test]
    fn residue_list_derefs_to_slice() {
        let residues = ResidueList::from(vec!["GLC", "GAL"]);
        assert_eq!(residues.len(), 2);
        assert_eq!(residues[1], "GAL");
        assert_eq!(residues.into_inner(), vec!["GLC", "GAL"]);
    }
}
