//! # Workflows Module
//!
//! High-level entry points that drive the engine end to end.
//!
//! ## Overview
//!
//! A workflow takes parsed input, a residue library and a structure registry, and produces a
//! finished structure in the registry. It owns the transient state of the run, reports
//! progress, and leaves the registry as it found it apart from the requested output.
//!
//! ## Architecture
//!
//! - **Oligomer Builder** ([`build`]) - Instantiates residues, condenses every glycosidic
//!   bond, sets phi/psi and relaxes the assembled oligosaccharide.

pub mod build;
