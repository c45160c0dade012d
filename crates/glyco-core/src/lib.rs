//! # glycobuild Core Library
//!
//! Assembles all-atom three-dimensional models of oligosaccharides from a connectivity table and
//! a library of monosaccharide templates.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture so that each concern can be tested in
//! isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularSystem`, `BondRecord`),
//!   file formats (connectivity tables, PDB), canonical atom ordering, the residue library and
//!   pure geometry.
//!
//! - **[`engine`]: The Logic Core.** The stateful pieces the build drives: the
//!   `StructureRegistry` handle table with its typed selections and fuse operation, the torsion
//!   accessor, and the geometry relaxer with its optional minimization backend.
//!
//! - **[`workflows`]: The Public API.** The oligomer builder, which ties `core` and `engine`
//!   together into a single `build` call.

pub mod core;
pub mod engine;
pub mod workflows;
