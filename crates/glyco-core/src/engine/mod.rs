//! # Engine Module
//!
//! The stateful machinery an oligosaccharide build drives.
//!
//! ## Overview
//!
//! A build never touches files or global state directly. It loads monosaccharide templates
//! into a [`registry::StructureRegistry`] under transient handles, strips leaving atoms and
//! fuses structures through typed [`selection::Selection`]s, sets glycosidic torsions with the
//! [`torsion`] accessor and finally cleans up the geometry with the [`relax`] module.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Torsion defaults, relaxation parameters, TOML loading
//! - **Structure Registry** ([`registry`]) - Named structures, markers and update suspension
//! - **Selections** ([`selection`]) - Residue, atom-name and object predicates
//! - **Torsions** ([`torsion`]) - Reading and setting phi/psi across a glycosidic bond
//! - **Relaxation** ([`relax`]) - Restraint sculpting and optional minimization
//! - **Progress Monitoring** ([`progress`]) - Callback based progress reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod error;
pub mod progress;
pub mod registry;
pub mod relax;
pub mod selection;
pub mod torsion;
