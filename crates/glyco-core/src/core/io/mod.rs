//! Provides input/output functionality for glycobuild's file formats.
//!
//! Two formats are understood: the whitespace-delimited connectivity table that describes an
//! oligosaccharide, and PDB files for monosaccharide templates and built structures. Canonical
//! per-residue atom ordering lives here as well, since it fixes the order atoms are written in.

pub mod connectivity;
pub mod pdb;
pub mod sorting;
pub mod traits;
