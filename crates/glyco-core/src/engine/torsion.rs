//! Glycosidic torsion angles.
//!
//! For a bond whose carbon side `c` links anomeric carbon `C{n}` to oxygen `O{m}` of the
//! oxygen side `o`:
//!
//! - phi = `O5(c) - C{n}(c) - O{m}(o) - C{m}(o)`
//! - psi = `C{n}(c) - O{m}(o) - C{m}(o) - C{m-1}(o)`, with `C2(o)` standing in when `m == 1`
//!
//! Residues are addressed by their residue number, which the builder sets to the residue's
//! index in the connectivity table. Angles are in degrees in `(-180, 180]`, IUPAC sign
//! convention. Setting a torsion rotates everything on the far side of the central bond (the
//! side holding the torsion's third atom) about the bond axis.

use super::error::TorsionError;
use crate::core::models::ids::AtomId;
use crate::core::models::linkage::BondRecord;
use crate::core::models::system::MolecularSystem;
use crate::core::utils::geometry::{dihedral_degrees, rotate_about_axis, wrap_degrees};
use tracing::trace;

/// The four atoms of a torsion, each given as residue index and atom name.
type TorsionAtoms = [(usize, String); 4];

fn phi_atoms(bond: &BondRecord) -> TorsionAtoms {
    let linkage = bond.linkage();
    let c = linkage.carbon;
    let o = linkage.oxygen;
    [
        (c.residue_index, "O5".to_string()),
        (c.residue_index, c.carbon_name()),
        (o.residue_index, o.oxygen_name()),
        (o.residue_index, o.carbon_name()),
    ]
}

fn psi_atoms(bond: &BondRecord) -> TorsionAtoms {
    let linkage = bond.linkage();
    let c = linkage.carbon;
    let o = linkage.oxygen;
    let fourth = if o.position <= 1 {
        "C2".to_string()
    } else {
        format!("C{}", o.position - 1)
    };
    [
        (c.residue_index, c.carbon_name()),
        (o.residue_index, o.oxygen_name()),
        (o.residue_index, o.carbon_name()),
        (o.residue_index, fourth),
    ]
}

fn resolve(system: &MolecularSystem, atoms: &TorsionAtoms) -> Result<[AtomId; 4], TorsionError> {
    let mut ids = [AtomId::default(); 4];
    for (slot, (residue_index, name)) in ids.iter_mut().zip(atoms) {
        let residue_number = *residue_index as isize;
        *slot = system.find_atom(residue_number, name).ok_or_else(|| {
            let residue_exists = system
                .residues_iter()
                .any(|(_, residue)| residue.residue_number == residue_number);
            if residue_exists {
                TorsionError::AtomNotFound {
                    residue_index: *residue_index,
                    atom_name: name.clone(),
                }
            } else {
                TorsionError::ResidueNotFound {
                    residue_index: *residue_index,
                }
            }
        })?;
    }
    Ok(ids)
}

fn measure(
    system: &MolecularSystem,
    atoms: &TorsionAtoms,
    torsion: &'static str,
) -> Result<f64, TorsionError> {
    let ids = resolve(system, atoms)?;
    let [a, b, c, d] = ids.map(|id| system.atom(id).map(|atom| atom.position));
    let (Some(a), Some(b), Some(c), Some(d)) = (a, b, c, d) else {
        return Err(TorsionError::DegenerateGeometry { torsion });
    };
    dihedral_degrees(&a, &b, &c, &d).ok_or(TorsionError::DegenerateGeometry { torsion })
}

fn rotate_to(
    system: &mut MolecularSystem,
    atoms: &TorsionAtoms,
    torsion: &'static str,
    target_degrees: f64,
) -> Result<(), TorsionError> {
    let current = measure(system, atoms, torsion)?;
    let delta = wrap_degrees(target_degrees - current);
    let [_, b, c, _] = resolve(system, atoms)?;

    let moving = system.fragment_beyond(b, c);
    if moving.contains(&b) {
        return Err(TorsionError::RingBond {
            atom1: atoms[1].1.clone(),
            atom2: atoms[2].1.clone(),
        });
    }

    let (Some(origin), Some(axis_end)) = (
        system.atom(b).map(|atom| atom.position),
        system.atom(c).map(|atom| atom.position),
    ) else {
        return Err(TorsionError::DegenerateGeometry { torsion });
    };
    let axis = axis_end - origin;

    trace!(
        torsion,
        current,
        target = target_degrees,
        moved = moving.len(),
        "Rotating fragment"
    );
    for atom_id in moving {
        if let Some(atom) = system.atom_mut(atom_id) {
            atom.position = rotate_about_axis(&atom.position, &origin, &axis, delta);
        }
    }
    Ok(())
}

pub fn get_phi(system: &MolecularSystem, bond: &BondRecord) -> Result<f64, TorsionError> {
    measure(system, &phi_atoms(bond), "phi")
}

pub fn get_psi(system: &MolecularSystem, bond: &BondRecord) -> Result<f64, TorsionError> {
    measure(system, &psi_atoms(bond), "psi")
}

pub fn set_phi(
    system: &mut MolecularSystem,
    bond: &BondRecord,
    degrees: f64,
) -> Result<(), TorsionError> {
    rotate_to(system, &phi_atoms(bond), "phi", degrees)
}

pub fn set_psi(
    system: &mut MolecularSystem,
    bond: &BondRecord,
    degrees: f64,
) -> Result<(), TorsionError> {
    rotate_to(system, &psi_atoms(bond), "psi", degrees)
}
