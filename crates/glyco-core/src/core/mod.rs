//! # Core Module
//!
//! The fundamental building blocks of glycobuild: molecular data structures, file formats,
//! residue templates, geometry helpers and the simple potentials used by the optional
//! minimizer.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, elements, residues, bonds, systems and
//!   glycosidic linkage records
//! - **File I/O** ([`io`]) - Connectivity tables, PDB templates and canonical atom ordering
//! - **Residue Templates** ([`residues`]) - Monosaccharide library lookup
//! - **Geometry** ([`utils`]) - Dihedrals, rotations and open-valence directions
//! - **Potentials** ([`forcefield`]) - Harmonic and Lennard-Jones terms

pub mod forcefield;
pub mod io;
pub mod models;
pub mod residues;
pub mod utils;
