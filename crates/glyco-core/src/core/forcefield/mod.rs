//! # Force Field Module
//!
//! Pairwise potentials and energy bookkeeping for the built-in steepest-descent minimizer.
//!
//! The force field is deliberately small: harmonic springs hold bond lengths and 1-3 distances
//! at their restraint values, and a Lennard-Jones 12-6 term keeps non-bonded atoms apart. There
//! are no partial charges or atom typing; the goal is to clean up a freshly assembled
//! oligosaccharide, not to score it.
//!
//! ## Key Components
//!
//! - [`potentials`] - Energy functions and their distance derivatives
//! - [`term`] - Energy aggregation by contribution

pub mod potentials;
pub mod term;
