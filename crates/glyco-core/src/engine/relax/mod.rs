//! Geometry clean-up after assembly.
//!
//! Relaxation always sculpts: restraints derived from each residue's reference geometry pull
//! bonds, angles and rings back into shape while close non-bonded contacts are pushed apart.
//! A [`Minimizer`] backend may then polish the result. Without a backend, or when the backend
//! reports itself unavailable, the structure is left as sculpted.

#[cfg(feature = "minimizer")]
pub mod minimize;
pub mod restraints;
pub mod sculpt;

use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::system::MolecularSystem;
use crate::core::utils::geometry::calculate_rmsd;
use crate::engine::config::RelaxConfig;
use crate::engine::error::RelaxError;
use sculpt::SculptReport;
use std::fmt;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationReport {
    pub steps: usize,
    pub initial_energy: EnergyTerm,
    pub final_energy: EnergyTerm,
    pub converged: bool,
}

/// An energy minimization backend run after sculpting.
pub trait Minimizer: fmt::Debug {
    fn name(&self) -> &str;
    fn minimize(&self, system: &mut MolecularSystem) -> Result<MinimizationReport, RelaxError>;
}

#[derive(Debug)]
pub enum RelaxStrategy {
    SculptOnly,
    SculptThenMinimize(Box<dyn Minimizer>),
}

impl RelaxStrategy {
    /// Picks the built-in backend when minimization is requested and compiled in.
    pub fn detect(config: &RelaxConfig) -> Self {
        if !config.minimize {
            return Self::SculptOnly;
        }
        match built_in_minimizer(config) {
            Some(minimizer) => Self::SculptThenMinimize(minimizer),
            None => {
                warn!("Minimization requested but no backend is compiled in; sculpting only");
                Self::SculptOnly
            }
        }
    }

    pub fn minimizes(&self) -> bool {
        matches!(self, Self::SculptThenMinimize(_))
    }
}

#[cfg(feature = "minimizer")]
fn built_in_minimizer(config: &RelaxConfig) -> Option<Box<dyn Minimizer>> {
    Some(Box::new(minimize::SteepestDescent::from_config(config)))
}

#[cfg(not(feature = "minimizer"))]
fn built_in_minimizer(_config: &RelaxConfig) -> Option<Box<dyn Minimizer>> {
    None
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxReport {
    pub sculpt: SculptReport,
    /// `None` when no minimization ran.
    pub minimization: Option<MinimizationReport>,
    /// RMSD between the coordinates before and after relaxation, in Angstroms.
    pub displacement_rmsd: f64,
    /// Non-bonded contacts still closer than their contact distance after relaxation.
    pub remaining_contacts: usize,
}

/// Sculpts `system`, then minimizes it if `strategy` carries a backend.
///
/// An unavailable backend is not an error: the structure stays as sculpted and a warning is
/// logged. Any other backend failure is returned.
#[instrument(skip_all, name = "relax")]
pub fn relax(
    system: &mut MolecularSystem,
    strategy: &RelaxStrategy,
    config: &RelaxConfig,
) -> Result<RelaxReport, RelaxError> {
    let start: Vec<_> = system.atoms_iter().map(|(_, atom)| atom.position).collect();
    let sculpt = sculpt::sculpt(system, config);
    if !sculpt.converged && config.sculpt_cycles > 0 {
        info!(
            cycles = sculpt.cycles_run,
            max_violation = sculpt.max_violation,
            "Sculpting stopped before reaching tolerance"
        );
    }

    let minimization = match strategy {
        RelaxStrategy::SculptOnly => None,
        RelaxStrategy::SculptThenMinimize(minimizer) => match minimizer.minimize(system) {
            Ok(report) => Some(report),
            Err(e @ RelaxError::BackendUnavailable { .. }) => {
                warn!(backend = minimizer.name(), "{}; keeping sculpted geometry", e);
                None
            }
            Err(e) => return Err(e),
        },
    };

    let end: Vec<_> = system.atoms_iter().map(|(_, atom)| atom.position).collect();
    let remaining_contacts = sculpt::contact_violations(system, config);
    if remaining_contacts > 0 {
        info!(remaining_contacts, "Close contacts remain after relaxation");
    }
    Ok(RelaxReport {
        sculpt,
        minimization,
        displacement_rmsd: calculate_rmsd(&start, &end).unwrap_or(0.0),
        remaining_contacts,
    })
}
