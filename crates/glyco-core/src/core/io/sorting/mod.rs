//! Canonical atom ordering for monosaccharide residues.
//!
//! Atoms are grouped by residue sequence number and, within a residue, ordered ring carbons
//! first, then oxygens, carbon-bound hydrogens and hydroxyl hydrogens. Written structures and
//! selection results therefore come out in the same order no matter how a template file was
//! laid out.

pub mod rules;
pub mod sorter;
