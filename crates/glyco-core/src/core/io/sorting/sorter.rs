use crate::core::io::sorting::rules::{ATOM_NAME_ALIASES, ATOM_ORDER_WEIGHTS};
use crate::core::models::atom::Atom;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use std::cmp::Ordering;

#[derive(Debug)]
pub struct CanonicalAtom<'a> {
    pub id: AtomId,
    pub source: &'a Atom,
    pub residue_number: isize,
}

/// Returns the atoms of `system` in canonical order without modifying it.
///
/// Atoms whose residue is missing sort last. The sort is stable, so atoms that compare equal
/// keep their current relative order.
pub fn sort_system_atoms(system: &MolecularSystem) -> Vec<CanonicalAtom<'_>> {
    let mut atoms_to_sort: Vec<CanonicalAtom> = system
        .atoms_iter()
        .map(|(atom_id, atom)| CanonicalAtom {
            id: atom_id,
            source: atom,
            residue_number: system
                .residue(atom.residue_id)
                .map_or(isize::MAX, |residue| residue.residue_number),
        })
        .collect();

    atoms_to_sort.sort_by(|a, b| {
        // Level 1: residue sequence number.
        a.residue_number
            .cmp(&b.residue_number)
            // Level 2: canonical atom name order within the residue.
            .then_with(|| compare_atom_names(&a.source.name, &b.source.name))
    });

    atoms_to_sort
}

/// Reorders the iteration order of `system` canonically.
pub fn apply_canonical_order(system: &mut MolecularSystem) {
    let order: Vec<AtomId> = sort_system_atoms(system)
        .into_iter()
        .map(|atom| atom.id)
        .collect();
    system.set_atom_order(order);
}

fn canonical_name(name: &str) -> &str {
    let trimmed = name.trim();
    ATOM_NAME_ALIASES.get(trimmed).copied().unwrap_or(trimmed)
}

pub fn compare_atom_names(name_a: &str, name_b: &str) -> Ordering {
    let canonical_a = canonical_name(name_a);
    let canonical_b = canonical_name(name_b);

    let weight_a = ATOM_ORDER_WEIGHTS
        .get(canonical_a)
        .copied()
        .unwrap_or(i32::MAX);
    let weight_b = ATOM_ORDER_WEIGHTS
        .get(canonical_b)
        .copied()
        .unwrap_or(i32::MAX);

    match weight_a.cmp(&weight_b) {
        Ordering::Equal => name_a.trim().cmp(name_b.trim()),
        other => other,
    }
}
