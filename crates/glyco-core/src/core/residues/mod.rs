//! Monosaccharide template lookup.
//!
//! The builder never reads files directly; it asks a [`library::ResidueLibrary`] for a fresh
//! copy of each residue's template structure.

pub mod library;
