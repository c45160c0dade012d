use super::restraints::{RestraintKind, RestraintSet};
use crate::core::models::system::MolecularSystem;
use crate::engine::config::RelaxConfig;
use nalgebra::Point3;
use tracing::{debug, instrument};

/// Cycles between rebuilds of the non-bonded neighbor list.
const NEIGHBOR_REFRESH: usize = 10;
/// Margin added to the neighbor list cutoff so that atoms drifting between rebuilds are kept.
const NEIGHBOR_SKIN: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SculptReport {
    pub cycles_run: usize,
    /// Largest restraint or contact violation seen in the last cycle, in Angstroms.
    pub max_violation: f64,
    pub converged: bool,
}

/// Moves the pair `(i, j)` toward `target` by `weight` of the error, splitting the correction
/// evenly between both atoms. Returns the violation before the correction.
fn correct_pair(positions: &mut [Point3<f64>], i: usize, j: usize, target: f64, weight: f64) -> f64 {
    let delta = positions[j] - positions[i];
    let dist = delta.norm();
    if dist < 1e-9 {
        return target;
    }
    let error = dist - target;
    let shift = delta * (0.5 * weight * error / dist);
    positions[i] += shift;
    positions[j] -= shift;
    error.abs()
}

/// Iteratively nudges atoms until every restraint and every excluded-volume contact is
/// satisfied within `config.tolerance`, or `config.sculpt_cycles` cycles have run.
///
/// Each cycle walks all distance restraints, then all non-bonded pairs closer than their
/// contact distance, and corrects them one after another. Torsions spanning residues carry no
/// restraint, so the glycosidic phi/psi values set before sculpting are only changed as far as
/// clashes demand.
#[instrument(skip_all, name = "sculpt", fields(atoms = system.atom_count()))]
pub fn sculpt(system: &mut MolecularSystem, config: &RelaxConfig) -> SculptReport {
    let set = RestraintSet::build(system);
    let mut positions = set.positions(system);
    let cutoff = set.max_contact_distance(config.vdw_scale) + NEIGHBOR_SKIN;
    let mut pairs = Vec::new();

    let mut report = SculptReport {
        cycles_run: 0,
        max_violation: measure_violation(&set, &positions, config),
        converged: false,
    };
    if report.max_violation < config.tolerance {
        report.converged = true;
        return report;
    }

    for cycle in 0..config.sculpt_cycles {
        if cycle % NEIGHBOR_REFRESH == 0 {
            pairs = set.neighbor_pairs(&positions, cutoff);
        }

        let mut max_violation: f64 = 0.0;
        for restraint in &set.restraints {
            let weight = match restraint.kind {
                RestraintKind::Bond => config.bond_weight,
                RestraintKind::Angle => config.angle_weight,
                RestraintKind::Torsion => config.torsion_weight,
            };
            let violation =
                correct_pair(&mut positions, restraint.i, restraint.j, restraint.target, weight);
            max_violation = max_violation.max(violation);
        }
        for &(i, j) in &pairs {
            let contact = set.contact_distance(i, j, config.vdw_scale);
            if (positions[j] - positions[i]).norm() < contact {
                let violation = correct_pair(&mut positions, i, j, contact, config.vdw_weight);
                max_violation = max_violation.max(violation);
            }
        }

        report.cycles_run = cycle + 1;
        if max_violation < config.tolerance {
            break;
        }
    }

    // Cycle maxima are taken before correction; the report describes the kept geometry.
    report.max_violation = measure_violation(&set, &positions, config);
    report.converged = report.max_violation < config.tolerance;
    set.write_back(system, &positions);
    debug!(
        cycles = report.cycles_run,
        max_violation = report.max_violation,
        converged = report.converged,
        "Sculpting finished"
    );
    report
}

/// Number of non-bonded pairs closer than their contact distance by more than
/// `config.tolerance`.
pub fn contact_violations(system: &MolecularSystem, config: &RelaxConfig) -> usize {
    let set = RestraintSet::build(system);
    let positions = set.positions(system);
    set.neighbor_pairs(&positions, set.max_contact_distance(config.vdw_scale))
        .into_iter()
        .filter(|&(i, j)| {
            set.contact_distance(i, j, config.vdw_scale) - (positions[j] - positions[i]).norm()
                > config.tolerance
        })
        .count()
}

fn measure_violation(set: &RestraintSet, positions: &[Point3<f64>], config: &RelaxConfig) -> f64 {
    let restraint_violation = set
        .restraints
        .iter()
        .map(|r| ((positions[r.j] - positions[r.i]).norm() - r.target).abs())
        .fold(0.0, f64::max);
    let contact_violation = set
        .neighbor_pairs(positions, set.max_contact_distance(config.vdw_scale))
        .into_iter()
        .map(|(i, j)| {
            set.contact_distance(i, j, config.vdw_scale) - (positions[j] - positions[i]).norm()
        })
        .fold(0.0, f64::max);
    restraint_violation.max(contact_violation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::residues::library::{DirectoryLibrary, ResidueLibrary};
    use nalgebra::Vector3;

    fn glucose() -> MolecularSystem {
        let mut system = DirectoryLibrary::bundled().load("GLC").unwrap();
        system.capture_reference_geometry();
        system
    }

    #[test]
    fn undisturbed_template_converges_immediately() {
        let mut system = glucose();
        let before: Vec<_> = system.atoms_iter().map(|(_, a)| a.position).collect();

        let report = sculpt(&mut system, &RelaxConfig::default());

        assert!(report.converged);
        assert_eq!(report.cycles_run, 0);
        let after: Vec<_> = system.atoms_iter().map(|(_, a)| a.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn stretched_bond_is_restored() {
        let mut system = glucose();
        let c1 = system.find_atom(1, "C1").unwrap();
        let o1 = system.find_atom(1, "O1").unwrap();
        let reference = (system.atom(c1).unwrap().position - system.atom(o1).unwrap().position).norm();
        system.atom_mut(o1).unwrap().position += Vector3::new(0.4, 0.3, 0.0);

        let report = sculpt(&mut system, &RelaxConfig::default());

        let restored = (system.atom(c1).unwrap().position - system.atom(o1).unwrap().position).norm();
        assert!(report.converged);
        assert!(report.cycles_run > 0);
        assert!((restored - reference).abs() < 0.05);
    }

    #[test]
    fn zero_cycles_leave_coordinates_untouched() {
        let mut system = glucose();
        let o1 = system.find_atom(1, "O1").unwrap();
        system.atom_mut(o1).unwrap().position += Vector3::new(0.5, 0.0, 0.0);
        let before: Vec<_> = system.atoms_iter().map(|(_, a)| a.position).collect();

        let config = RelaxConfig {
            sculpt_cycles: 0,
            ..RelaxConfig::default()
        };
        let report = sculpt(&mut system, &config);

        assert!(!report.converged);
        assert_eq!(report.cycles_run, 0);
        assert!(report.max_violation > 0.1);
        let after: Vec<_> = system.atoms_iter().map(|(_, a)| a.position).collect();
        assert_eq!(before, after);
    }

    fn clashing_glucose() -> MolecularSystem {
        let mut system = glucose();
        let h1 = system.find_atom(1, "H1").unwrap();
        let h3o = system.find_atom(1, "H3o").unwrap();
        let above_h1 = system.atom(h1).unwrap().position + Vector3::new(0.0, 0.0, 0.5);
        system.atom_mut(h3o).unwrap().position = above_h1;
        system
    }

    #[test]
    fn unresolved_contacts_are_counted_and_block_convergence() {
        let mut system = clashing_glucose();
        let config = RelaxConfig {
            sculpt_cycles: 0,
            ..RelaxConfig::default()
        };

        assert!(contact_violations(&system, &config) > 0);
        let report = sculpt(&mut system, &config);
        assert!(!report.converged);
        assert!(report.max_violation > 1.0);
    }

    #[test]
    fn report_matches_the_geometry_written_back() {
        let mut system = clashing_glucose();
        let config = RelaxConfig::default();

        let report = sculpt(&mut system, &config);

        assert!(report.cycles_run > 0);
        assert_eq!(report.converged, report.max_violation < config.tolerance);
        if report.converged {
            assert_eq!(contact_violations(&system, &config), 0);
        }
        let set = RestraintSet::build(&system);
        let positions = set.positions(&system);
        assert!((measure_violation(&set, &positions, &config) - report.max_violation).abs() < 1e-9);
    }
}
