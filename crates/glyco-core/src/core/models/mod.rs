//! # Core Models Module
//!
//! Data structures used to represent monosaccharide templates and assembled oligosaccharides.
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atoms with coordinates and the geometry they were loaded with
//! - [`element`] - Chemical elements and their radii/valence tables
//! - [`residue`] - Monosaccharide residues and their atom name index
//! - [`system`] - Complete molecular system with connectivity
//! - [`topology`] - Covalent bonds and bond orders
//! - [`linkage`] - Connectivity-table records describing glycosidic bonds
//! - [`ids`] - Stable identifiers for atoms and residues
//!
//! ## Usage
//!
//! ```ignore
//! use glycobuild::core::models::{atom::Atom, element::Element, system::MolecularSystem};
//!
//! let mut system = MolecularSystem::new();
//! let residue_id = system.add_residue(1, "GLC");
//! let c1 = system.add_atom_to_residue(residue_id, Atom::new("C1", Element::C, residue_id, origin))?;
//! ```

pub mod atom;
pub mod element;
pub mod ids;
pub mod linkage;
pub mod residue;
pub mod system;
pub mod topology;
