use super::restraints::{RestraintKind, RestraintSet};
use super::{MinimizationReport, Minimizer};
use crate::core::forcefield::potentials::{
    harmonic, harmonic_derivative, lennard_jones_12_6, lennard_jones_12_6_derivative,
};
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::RelaxConfig;
use crate::engine::error::RelaxError;
use nalgebra::{Point3, Vector3};
use tracing::{debug, instrument};

const BOND_FORCE_CONSTANT: f64 = 300.0;
const ANGLE_FORCE_CONSTANT: f64 = 50.0;
const TORSION_FORCE_CONSTANT: f64 = 10.0;
const CONTACT_WELL_DEPTH: f64 = 0.2;
const NEIGHBOR_REFRESH: usize = 10;
const NEIGHBOR_SKIN: f64 = 1.0;
const MAX_STEP: f64 = 0.2;
const MIN_STEP: f64 = 1e-6;

/// Built-in steepest-descent minimizer over a restraint force field.
///
/// Restrained pairs feel harmonic springs, and non-bonded pairs closer than their contact
/// distance feel the repulsive branch of a 12-6 potential shifted to zero at contact. The step
/// size adapts: it grows after every accepted step and halves after every rejected one.
#[derive(Debug, Clone, PartialEq)]
pub struct SteepestDescent {
    pub max_steps: usize,
    pub step_size: f64,
    pub force_tolerance: f64,
    pub vdw_scale: f64,
}

impl SteepestDescent {
    pub fn from_config(config: &RelaxConfig) -> Self {
        Self {
            max_steps: config.minimize_steps,
            step_size: config.minimize_step_size,
            force_tolerance: config.force_tolerance,
            vdw_scale: config.vdw_scale,
        }
    }
}

struct ForceField<'a> {
    set: &'a RestraintSet,
    vdw_scale: f64,
}

impl ForceField<'_> {
    fn evaluate(
        &self,
        positions: &[Point3<f64>],
        pairs: &[(usize, usize)],
        gradient: Option<&mut [Vector3<f64>]>,
    ) -> EnergyTerm {
        let mut energy = EnergyTerm::default();
        let mut gradient = gradient;
        if let Some(g) = gradient.as_deref_mut() {
            g.iter_mut().for_each(|v| *v = Vector3::zeros());
        }

        for restraint in &self.set.restraints {
            let k = match restraint.kind {
                RestraintKind::Bond => BOND_FORCE_CONSTANT,
                RestraintKind::Angle => ANGLE_FORCE_CONSTANT,
                RestraintKind::Torsion => TORSION_FORCE_CONSTANT,
            };
            let (i, j) = (restraint.i, restraint.j);
            let delta = positions[i] - positions[j];
            let dist = delta.norm();
            let e = harmonic(dist, restraint.target, k);
            match restraint.kind {
                RestraintKind::Bond => energy.bond += e,
                RestraintKind::Angle | RestraintKind::Torsion => energy.angle += e,
            }
            if let Some(g) = gradient.as_deref_mut() {
                if dist > 1e-9 {
                    let f = delta * (harmonic_derivative(dist, restraint.target, k) / dist);
                    g[i] += f;
                    g[j] -= f;
                }
            }
        }

        for &(i, j) in pairs {
            let contact = self.set.contact_distance(i, j, self.vdw_scale);
            let delta = positions[i] - positions[j];
            let dist = delta.norm();
            if dist >= contact {
                continue;
            }
            energy.vdw +=
                lennard_jones_12_6(dist, contact, CONTACT_WELL_DEPTH) + CONTACT_WELL_DEPTH;
            if let Some(g) = gradient.as_deref_mut() {
                if dist > 1e-9 {
                    let f = delta
                        * (lennard_jones_12_6_derivative(dist, contact, CONTACT_WELL_DEPTH) / dist);
                    g[i] += f;
                    g[j] -= f;
                }
            }
        }
        energy
    }
}

impl Minimizer for SteepestDescent {
    fn name(&self) -> &str {
        "steepest-descent"
    }

    #[instrument(skip_all, name = "minimize", fields(atoms = system.atom_count()))]
    fn minimize(&self, system: &mut MolecularSystem) -> Result<MinimizationReport, RelaxError> {
        let set = RestraintSet::build(system);
        let field = ForceField {
            set: &set,
            vdw_scale: self.vdw_scale,
        };
        let cutoff = set.max_contact_distance(self.vdw_scale) + NEIGHBOR_SKIN;
        let mut positions = set.positions(system);
        let mut gradient = vec![Vector3::zeros(); positions.len()];
        let mut pairs = set.neighbor_pairs(&positions, cutoff);

        let initial = field.evaluate(&positions, &pairs, Some(gradient.as_mut_slice()));
        if !initial.total().is_finite() {
            return Err(RelaxError::Diverged { step: 0 });
        }

        let mut current = initial;
        let mut step_size = self.step_size;
        let mut steps = 0;
        let mut converged = false;

        while steps < self.max_steps {
            let max_force = gradient.iter().map(|g| g.amax()).fold(0.0, f64::max);
            if max_force < self.force_tolerance {
                converged = true;
                break;
            }
            steps += 1;

            let scale = step_size / max_force;
            let trial: Vec<Point3<f64>> = positions
                .iter()
                .zip(&gradient)
                .map(|(p, g)| p - g * scale)
                .collect();
            if steps % NEIGHBOR_REFRESH == 0 {
                pairs = set.neighbor_pairs(&trial, cutoff);
            }
            let energy = field.evaluate(&trial, &pairs, None);

            if energy.total() < current.total() {
                positions = trial;
                current = field.evaluate(&positions, &pairs, Some(gradient.as_mut_slice()));
                step_size = (step_size * 1.2).min(MAX_STEP);
            } else {
                step_size *= 0.5;
                if step_size < MIN_STEP {
                    break;
                }
            }
        }

        set.write_back(system, &positions);
        debug!(
            steps,
            initial = initial.total(),
            final_energy = current.total(),
            converged,
            "Minimization finished"
        );
        Ok(MinimizationReport {
            steps,
            initial_energy: initial,
            final_energy: current,
            converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::residues::library::{DirectoryLibrary, ResidueLibrary};

    fn distorted_glucose() -> MolecularSystem {
        let mut system = DirectoryLibrary::bundled().load("GLC").unwrap();
        system.capture_reference_geometry();
        let o1 = system.find_atom(1, "O1").unwrap();
        system.atom_mut(o1).unwrap().position += Vector3::new(0.3, -0.2, 0.1);
        system
    }

    #[test]
    fn minimization_lowers_energy() {
        let mut system = distorted_glucose();
        let minimizer = SteepestDescent::from_config(&RelaxConfig::default());

        let report = minimizer.minimize(&mut system).unwrap();

        assert!(report.steps > 0);
        assert!(report.final_energy.total() < report.initial_energy.total());
        assert!(report.initial_energy.bond > 0.0);
    }

    #[test]
    fn relaxed_template_has_zero_energy_and_is_left_alone() {
        let mut system = DirectoryLibrary::bundled().load("GLC").unwrap();
        system.capture_reference_geometry();
        let before: Vec<_> = system.atoms_iter().map(|(_, a)| a.position).collect();

        let report = SteepestDescent::from_config(&RelaxConfig::default())
            .minimize(&mut system)
            .unwrap();

        assert!(report.converged);
        assert_eq!(report.steps, 0);
        assert!(report.initial_energy.total().abs() < 1e-12);
        let after: Vec<_> = system.atoms_iter().map(|(_, a)| a.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn analytic_gradient_matches_finite_differences() {
        let system = distorted_glucose();
        let set = RestraintSet::build(&system);
        let field = ForceField {
            set: &set,
            vdw_scale: 0.8,
        };
        let positions = set.positions(&system);
        let pairs = set.neighbor_pairs(&positions, 10.0);
        let mut gradient = vec![Vector3::zeros(); positions.len()];
        field.evaluate(&positions, &pairs, Some(gradient.as_mut_slice()));

        let h = 1e-6;
        for atom in [0, positions.len() / 2] {
            for axis in 0..3 {
                let mut plus = positions.clone();
                let mut minus = positions.clone();
                plus[atom][axis] += h;
                minus[atom][axis] -= h;
                let numeric = (field.evaluate(&plus, &pairs, None).total()
                    - field.evaluate(&minus, &pairs, None).total())
                    / (2.0 * h);
                assert!((numeric - gradient[atom][axis]).abs() < 1e-4);
            }
        }
    }
}
