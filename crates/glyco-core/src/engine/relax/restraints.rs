use crate::core::models::element::Element;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::system::MolecularSystem;
use crate::core::utils::geometry::tetrahedral_one_three_distance;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestraintKind {
    /// Directly bonded pair.
    Bond,
    /// Outer atoms of a bond angle.
    Angle,
    /// Outer atoms of an intra-residue dihedral.
    Torsion,
}

/// Target distance between two atoms, addressed by their index in [`RestraintSet::ids`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRestraint {
    pub i: usize,
    pub j: usize,
    pub target: f64,
    pub kind: RestraintKind,
}

/// The distance restraints and non-bonded exclusions derived from a structure's topology.
///
/// Pairs inside one residue are restrained to the distances they had in the residue's
/// reference geometry: bonds, angles (1-3) and dihedrals (1-4), which together hold rings and
/// substituents in shape. Bonds and angles that span residues have no reference and get ideal
/// values instead: the sum of covalent radii, and the tetrahedral 1-3 distance. Dihedrals that
/// span residues, the glycosidic torsions among them, are left free.
#[derive(Debug, Clone)]
pub struct RestraintSet {
    pub ids: Vec<AtomId>,
    pub restraints: Vec<DistanceRestraint>,
    elements: Vec<Element>,
    residues: Vec<ResidueId>,
    references: Vec<Option<Point3<f64>>>,
    /// Pairs `(i, j)`, `i < j`, at most three bonds apart.
    excluded: HashSet<(usize, usize)>,
}

fn ordered(i: usize, j: usize) -> (usize, usize) {
    if i < j { (i, j) } else { (j, i) }
}

impl RestraintSet {
    pub fn build(system: &MolecularSystem) -> Self {
        let ids: Vec<AtomId> = system.atom_ids().to_vec();
        let index: HashMap<AtomId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut elements = Vec::with_capacity(ids.len());
        let mut residues = Vec::with_capacity(ids.len());
        let mut references = Vec::with_capacity(ids.len());
        for (_, atom) in system.atoms_iter() {
            elements.push(atom.element);
            residues.push(atom.residue_id);
            references.push(atom.reference_position);
        }

        let neighbors: Vec<Vec<usize>> = ids
            .iter()
            .map(|&id| {
                system
                    .get_bonded_neighbors(id)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|n| index.get(n).copied())
                    .collect()
            })
            .collect();

        let mut set = Self {
            ids,
            restraints: Vec::new(),
            elements,
            residues,
            references,
            excluded: HashSet::new(),
        };

        let mut bond_targets: HashMap<(usize, usize), f64> = HashMap::new();
        for (i, partners) in neighbors.iter().enumerate() {
            for &j in partners.iter().filter(|&&j| j > i) {
                let target = set
                    .reference_distance(&[i, j])
                    .unwrap_or_else(|| set.elements[i].covalent_radius() + set.elements[j].covalent_radius());
                bond_targets.insert((i, j), target);
                set.push(i, j, target, RestraintKind::Bond);
            }
        }

        for (b, partners) in neighbors.iter().enumerate() {
            for (x, &a) in partners.iter().enumerate() {
                for &c in &partners[x + 1..] {
                    if set.excluded.contains(&ordered(a, c)) {
                        continue;
                    }
                    let target = set.reference_distance(&[a, b, c]).unwrap_or_else(|| {
                        tetrahedral_one_three_distance(
                            bond_targets.get(&ordered(a, b)).copied().unwrap_or(1.5),
                            bond_targets.get(&ordered(b, c)).copied().unwrap_or(1.5),
                        )
                    });
                    set.push(a, c, target, RestraintKind::Angle);
                }
            }
        }

        let mut bonded_pairs: Vec<(usize, usize)> = bond_targets.keys().copied().collect();
        bonded_pairs.sort_unstable();
        for (b, c) in bonded_pairs {
            for &a in neighbors[b].iter().filter(|&&a| a != c) {
                for &d in neighbors[c].iter().filter(|&&d| d != b && d != a) {
                    if set.excluded.contains(&ordered(a, d)) {
                        continue;
                    }
                    match set.reference_distance(&[a, b, c, d]) {
                        Some(target) => set.push(a, d, target, RestraintKind::Torsion),
                        None => {
                            set.excluded.insert(ordered(a, d));
                        }
                    }
                }
            }
        }

        set
    }

    fn push(&mut self, i: usize, j: usize, target: f64, kind: RestraintKind) {
        self.excluded.insert(ordered(i, j));
        self.restraints.push(DistanceRestraint { i, j, target, kind });
    }

    /// Reference distance between the first and last of `chain`, if all atoms of the chain
    /// belong to one residue and carry reference coordinates.
    fn reference_distance(&self, chain: &[usize]) -> Option<f64> {
        let first = *chain.first()?;
        let last = *chain.last()?;
        if chain.iter().any(|&k| self.residues[k] != self.residues[first]) {
            return None;
        }
        if chain.iter().any(|&k| self.references[k].is_none()) {
            return None;
        }
        let (a, b) = (self.references[first]?, self.references[last]?);
        Some((a - b).norm())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_excluded(&self, i: usize, j: usize) -> bool {
        self.excluded.contains(&ordered(i, j))
    }

    /// Closest approach tolerated between two non-bonded atoms: `scale` times the sum of their
    /// van der Waals radii, relaxed to the reference distance for pairs of the same residue.
    pub fn contact_distance(&self, i: usize, j: usize, scale: f64) -> f64 {
        let contact = scale * (self.elements[i].vdw_radius() + self.elements[j].vdw_radius());
        match self.reference_distance(&[i, j]) {
            Some(reference) => contact.min(reference),
            None => contact,
        }
    }

    /// Largest contact distance any pair can have at `scale`.
    pub fn max_contact_distance(&self, scale: f64) -> f64 {
        let largest = self
            .elements
            .iter()
            .map(|e| e.vdw_radius())
            .fold(0.0, f64::max);
        2.0 * scale * largest
    }

    pub fn positions(&self, system: &MolecularSystem) -> Vec<Point3<f64>> {
        self.ids
            .iter()
            .map(|&id| system.atom(id).map_or_else(Point3::origin, |atom| atom.position))
            .collect()
    }

    pub fn write_back(&self, system: &mut MolecularSystem, positions: &[Point3<f64>]) {
        for (&id, position) in self.ids.iter().zip(positions) {
            if let Some(atom) = system.atom_mut(id) {
                atom.position = *position;
            }
        }
    }

    /// Non-excluded pairs `(i, j)`, `i < j`, closer than `cutoff`, found with a k-d tree.
    pub fn neighbor_pairs(&self, positions: &[Point3<f64>], cutoff: f64) -> Vec<(usize, usize)> {
        if positions.is_empty() {
            return Vec::new();
        }
        let coords: Vec<[f64; 3]> = positions.iter().map(|p| [p.x, p.y, p.z]).collect();
        let kdtree: KdTree<f64, 3> = (&coords).into();
        let cutoff_sq = cutoff * cutoff;

        let mut pairs = Vec::new();
        for (i, query) in coords.iter().enumerate() {
            for neighbor in kdtree.within_unsorted::<SquaredEuclidean>(query, cutoff_sq) {
                let j = neighbor.item as usize;
                if j > i && !self.is_excluded(i, j) {
                    pairs.push((i, j));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::residues::library::{DirectoryLibrary, ResidueLibrary};

    fn glucose_with_reference() -> MolecularSystem {
        let mut system = DirectoryLibrary::bundled().load("GLC").unwrap();
        system.capture_reference_geometry();
        system
    }

    #[test]
    fn template_restraints_match_reference_geometry() {
        let system = glucose_with_reference();
        let set = RestraintSet::build(&system);
        let positions = set.positions(&system);

        let bonds = set
            .restraints
            .iter()
            .filter(|r| r.kind == RestraintKind::Bond)
            .count();
        assert_eq!(bonds, system.bonds().len());
        for restraint in &set.restraints {
            let dist = (positions[restraint.i] - positions[restraint.j]).norm();
            assert!((dist - restraint.target).abs() < 1e-9);
        }
        assert!(set.restraints.iter().any(|r| r.kind == RestraintKind::Torsion));
    }

    #[test]
    fn bonded_and_angle_pairs_are_excluded_from_contacts() {
        let system = glucose_with_reference();
        let set = RestraintSet::build(&system);
        let index = |name: &str| {
            let id = system.find_atom(1, name).unwrap();
            set.ids.iter().position(|&x| x == id).unwrap()
        };

        assert!(set.is_excluded(index("C1"), index("O1")));
        assert!(set.is_excluded(index("C2"), index("O1")));
        assert!(set.is_excluded(index("H1o"), index("C1")));
        let pairs = set.neighbor_pairs(&set.positions(&system), 10.0);
        assert!(pairs.iter().all(|&(i, j)| i < j && !set.is_excluded(i, j)));
    }

    #[test]
    fn atoms_without_reference_get_ideal_targets() {
        let system = DirectoryLibrary::bundled().load("GLC").unwrap();
        let set = RestraintSet::build(&system);

        let bond = set
            .restraints
            .iter()
            .find(|r| r.kind == RestraintKind::Bond)
            .unwrap();
        let expected =
            set.elements[bond.i].covalent_radius() + set.elements[bond.j].covalent_radius();
        assert!((bond.target - expected).abs() < 1e-12);
        assert!(set.restraints.iter().all(|r| r.kind != RestraintKind::Torsion));
    }

    #[test]
    fn contact_distance_never_exceeds_reference() {
        let system = glucose_with_reference();
        let set = RestraintSet::build(&system);
        let max = set.max_contact_distance(0.8);
        for i in 0..set.len() {
            for j in (i + 1)..set.len() {
                assert!(set.contact_distance(i, j, 0.8) <= max + 1e-12);
            }
        }
    }
}
