use super::atom::Atom;
use super::ids::{AtomId, ResidueId};
use super::residue::Residue;
use super::topology::{Bond, BondOrder};
use nalgebra::Isometry3;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashMap, HashSet, VecDeque};

/// Represents a complete molecular structure with atoms, residues and bonds.
///
/// Atoms are stored in a slot map for stable IDs, while a separate ordered list keeps the
/// canonical atom order used for iteration, selection and file output.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// List of all bonds in the system.
    bonds: Vec<Bond>,
    /// Cached adjacency list for bond connectivity, indexed by atom ID.
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
    /// Iteration order of atoms; canonical after sorting.
    atom_order: Vec<AtomId>,
}

impl MolecularSystem {
    /// Creates a new, empty molecular system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns the atom IDs in iteration order.
    pub fn atom_ids(&self) -> &[AtomId] {
        &self.atom_order
    }

    /// Returns an iterator over all atoms in iteration order.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &Atom)` pairs.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atom_order
            .iter()
            .filter_map(|&id| self.atoms.get(id).map(|atom| (id, atom)))
    }

    /// Returns a mutable iterator over all atoms in storage order.
    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = (AtomId, &mut Atom)> {
        self.atoms.iter_mut()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Retrieves an immutable reference to a residue by its ID.
    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Retrieves a mutable reference to a residue by its ID.
    pub fn residue_mut(&mut self, id: ResidueId) -> Option<&mut Residue> {
        self.residues.get_mut(id)
    }

    /// Returns an iterator over all residues in the system.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residues.iter()
    }

    /// Returns a slice of all bonds in the system.
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Residue sequence number of the residue owning `atom_id`.
    pub fn residue_number_of(&self, atom_id: AtomId) -> Option<isize> {
        let atom = self.atoms.get(atom_id)?;
        self.residues
            .get(atom.residue_id)
            .map(|residue| residue.residue_number)
    }

    /// Finds an atom by residue sequence number and atom name.
    ///
    /// When several residues share the number, the first residue containing the name wins.
    pub fn find_atom(&self, residue_number: isize, atom_name: &str) -> Option<AtomId> {
        self.residues
            .values()
            .filter(|residue| residue.residue_number == residue_number)
            .find_map(|residue| residue.get_atom_id_by_name(atom_name))
    }

    /// Adds a new residue to the system.
    ///
    /// # Arguments
    ///
    /// * `residue_number` - The sequence number of the residue.
    /// * `name` - The name of the residue.
    ///
    /// # Return
    ///
    /// The ID of the new residue.
    pub fn add_residue(&mut self, residue_number: isize, name: &str) -> ResidueId {
        self.residues.insert(Residue::new(residue_number, name))
    }

    /// Adds an atom to a specific residue.
    ///
    /// The atom's `residue_id` is overwritten with `residue_id`.
    ///
    /// # Return
    ///
    /// Returns `Some(AtomId)` if successful, otherwise `None` (the residue doesn't exist).
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }
        atom.residue_id = residue_id;
        let name = atom.name.clone();

        let atom_id = self.atoms.insert(atom);
        self.bond_adjacency.insert(atom_id, Vec::new());
        self.atom_order.push(atom_id);
        self.residues[residue_id].add_atom(&name, atom_id);

        Some(atom_id)
    }

    /// Adds a bond between two atoms.
    ///
    /// Adding an existing bond succeeds without creating duplicates.
    ///
    /// # Return
    ///
    /// Returns `Some(())` if successful, otherwise `None` (an atom doesn't exist or the two IDs
    /// are the same).
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if atom1_id == atom2_id
            || !self.atoms.contains_key(atom1_id)
            || !self.atoms.contains_key(atom2_id)
        {
            return None;
        }

        if self.are_bonded(atom1_id, atom2_id) {
            return Some(());
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    pub fn are_bonded(&self, atom1_id: AtomId, atom2_id: AtomId) -> bool {
        self.bond_adjacency
            .get(atom1_id)
            .is_some_and(|neighbors| neighbors.contains(&atom2_id))
    }

    /// Removes an atom from the system, together with its bonds.
    ///
    /// # Return
    ///
    /// Returns `Some(Atom)` if the atom existed and was removed, otherwise `None`.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;

        if let Some(residue) = self.residues.get_mut(atom.residue_id) {
            residue.remove_atom(&atom.name, atom_id);
        }

        self.bonds.retain(|bond| !bond.contains(atom_id));

        let neighbors = self.bond_adjacency.remove(atom_id).unwrap_or_default();
        for neighbor_id in neighbors {
            if let Some(adjacency) = self.bond_adjacency.get_mut(neighbor_id) {
                adjacency.retain(|&id| id != atom_id);
            }
        }

        self.atom_order.retain(|&id| id != atom_id);

        Some(atom)
    }

    /// Retrieves the bonded neighbors of an atom.
    ///
    /// # Return
    ///
    /// Returns `Some(&[AtomId])` if the atom exists, otherwise `None`.
    pub fn get_bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Replaces the iteration order. `order` must be a permutation of the current atom IDs.
    pub(crate) fn set_atom_order(&mut self, order: Vec<AtomId>) {
        debug_assert_eq!(order.len(), self.atom_order.len());
        self.atom_order = order;
    }

    /// Records the current coordinates of every atom as its reference geometry.
    pub fn capture_reference_geometry(&mut self) {
        for atom in self.atoms.values_mut() {
            atom.reference_position = Some(atom.position);
        }
    }

    /// Applies a rigid-body transformation to every atom.
    pub fn transform(&mut self, isometry: &Isometry3<f64>) {
        for atom in self.atoms.values_mut() {
            atom.position = isometry * atom.position;
        }
    }

    /// Moves all atoms, residues and bonds of `other` into this system.
    ///
    /// Absorbed atoms are appended to the iteration order.
    ///
    /// # Return
    ///
    /// A map from the atom IDs of `other` to their new IDs in `self`.
    pub fn absorb(&mut self, other: MolecularSystem) -> HashMap<AtomId, AtomId> {
        let mut residue_map: HashMap<ResidueId, ResidueId> = HashMap::new();
        for (old_id, residue) in other.residues.iter() {
            let new_id = self.add_residue(residue.residue_number, &residue.name);
            residue_map.insert(old_id, new_id);
        }

        let mut atom_map = HashMap::with_capacity(other.atoms.len());
        for &old_atom_id in &other.atom_order {
            let Some(atom) = other.atoms.get(old_atom_id) else {
                continue;
            };
            let Some(&new_residue_id) = residue_map.get(&atom.residue_id) else {
                continue;
            };
            if let Some(new_atom_id) = self.add_atom_to_residue(new_residue_id, atom.clone()) {
                atom_map.insert(old_atom_id, new_atom_id);
            }
        }

        for bond in &other.bonds {
            if let (Some(&a), Some(&b)) = (atom_map.get(&bond.atom1_id), atom_map.get(&bond.atom2_id)) {
                self.add_bond(a, b, bond.order);
            }
        }

        atom_map
    }

    /// Collects the atoms reachable from `start` without crossing the bond `start`-`barrier`.
    ///
    /// If `barrier` is still reached, the bond lies in a ring and the returned set contains it.
    pub fn fragment_beyond(&self, barrier: AtomId, start: AtomId) -> HashSet<AtomId> {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &next in self.get_bonded_neighbors(current).unwrap_or_default() {
                if current == start && next == barrier {
                    continue;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        visited
    }

    /// Number of covalently disconnected fragments.
    pub fn fragment_count(&self) -> usize {
        let mut visited: HashSet<AtomId> = HashSet::with_capacity(self.atoms.len());
        let mut fragments = 0;
        for &seed in &self.atom_order {
            if !visited.insert(seed) {
                continue;
            }
            fragments += 1;
            let mut queue = VecDeque::from([seed]);
            while let Some(current) = queue.pop_front() {
                for &next in self.get_bonded_neighbors(current).unwrap_or_default() {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        fragments
    }

    /// Atoms bonded to more partners than their element allows.
    pub fn valence_violations(&self) -> Vec<AtomId> {
        self.atoms_iter()
            .filter(|(id, atom)| {
                self.get_bonded_neighbors(*id)
                    .is_some_and(|n| n.len() > atom.element.max_valence())
            })
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;
    use nalgebra::{Point3, Translation3, UnitQuaternion};

    struct TestRefs {
        residue_id: ResidueId,
        c1: AtomId,
        o1: AtomId,
        h1o: AtomId,
    }

    fn create_hydroxyl_system() -> (MolecularSystem, TestRefs) {
        let mut system = MolecularSystem::new();
        let residue_id = system.add_residue(1, "GLC");
        let c1 = system
            .add_atom_to_residue(
                residue_id,
                Atom::new("C1", Element::C, residue_id, Point3::new(0.0, 0.0, 0.0)),
            )
            .unwrap();
        let o1 = system
            .add_atom_to_residue(
                residue_id,
                Atom::new("O1", Element::O, residue_id, Point3::new(1.43, 0.0, 0.0)),
            )
            .unwrap();
        let h1o = system
            .add_atom_to_residue(
                residue_id,
                Atom::new("H1o", Element::H, residue_id, Point3::new(1.75, 0.9, 0.0)),
            )
            .unwrap();
        system.add_bond(c1, o1, BondOrder::Single).unwrap();
        system.add_bond(o1, h1o, BondOrder::Single).unwrap();
        (
            system,
            TestRefs {
                residue_id,
                c1,
                o1,
                h1o,
            },
        )
    }

    #[test]
    fn system_creation_and_access() {
        let (system, refs) = create_hydroxyl_system();

        assert_eq!(system.atom_count(), 3);
        assert_eq!(system.residues_iter().count(), 1);
        assert_eq!(system.bonds().len(), 2);
        assert_eq!(system.find_atom(1, "O1"), Some(refs.o1));
        assert_eq!(system.find_atom(2, "O1"), None);
        assert_eq!(system.residue_number_of(refs.h1o), Some(1));
        assert_eq!(system.atom_ids(), &[refs.c1, refs.o1, refs.h1o]);
    }

    #[test]
    fn atom_removal_updates_system_correctly() {
        let (mut system, refs) = create_hydroxyl_system();

        let removed = system.remove_atom(refs.o1).unwrap();

        assert_eq!(removed.name, "O1");
        assert_eq!(system.atom_count(), 2);
        assert!(system.bonds().is_empty());
        assert!(system.get_bonded_neighbors(refs.c1).unwrap().is_empty());
        assert!(system.get_bonded_neighbors(refs.o1).is_none());
        assert_eq!(system.residue(refs.residue_id).unwrap().atoms().len(), 2);
        assert_eq!(system.atom_ids(), &[refs.c1, refs.h1o]);
    }

    #[test]
    fn idempotent_add_bond_does_not_create_duplicates() {
        let (mut system, refs) = create_hydroxyl_system();
        system.add_bond(refs.o1, refs.c1, BondOrder::Single).unwrap();
        assert_eq!(system.bonds().len(), 2);
        assert!(system.add_bond(refs.c1, refs.c1, BondOrder::Single).is_none());
    }

    #[test]
    fn absorb_moves_atoms_bonds_and_residues() {
        let (mut first, _) = create_hydroxyl_system();
        let (mut second, second_refs) = create_hydroxyl_system();
        let residue_ids: Vec<_> = second.residues_iter().map(|(id, _)| id).collect();
        for id in residue_ids {
            second.residue_mut(id).unwrap().residue_number = 2;
        }

        let map = first.absorb(second);

        assert_eq!(first.atom_count(), 6);
        assert_eq!(first.bonds().len(), 4);
        assert_eq!(first.residues_iter().count(), 2);
        let new_o1 = map[&second_refs.o1];
        assert_eq!(first.find_atom(2, "O1"), Some(new_o1));
        assert_eq!(first.fragment_count(), 2);
    }

    #[test]
    fn fragment_beyond_stops_at_barrier_bond() {
        let (system, refs) = create_hydroxyl_system();
        let fragment = system.fragment_beyond(refs.c1, refs.o1);
        assert_eq!(fragment, HashSet::from([refs.o1, refs.h1o]));
    }

    #[test]
    fn transform_and_reference_geometry() {
        let (mut system, refs) = create_hydroxyl_system();
        system.capture_reference_geometry();
        let shift = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::identity(),
        );
        system.transform(&shift);

        let c1 = system.atom(refs.c1).unwrap();
        assert_eq!(c1.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(c1.reference_position, Some(Point3::origin()));
    }

    #[test]
    fn valence_violations_flag_overbonded_hydrogen() {
        let (mut system, refs) = create_hydroxyl_system();
        assert!(system.valence_violations().is_empty());
        system.add_bond(refs.c1, refs.h1o, BondOrder::Single).unwrap();
        assert_eq!(system.valence_violations(), vec![refs.h1o]);
    }
}
