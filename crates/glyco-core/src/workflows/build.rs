use crate::core::models::linkage::BondRecord;
use crate::core::residues::library::{LibraryError, ResidueLibrary};
use crate::engine::config::{BuildConfig, ConfigError};
use crate::engine::error::{RegistryError, RelaxError, TorsionError};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::registry::{FUSE_MARKERS, StructureRegistry};
use crate::engine::relax::{RelaxReport, RelaxStrategy, relax};
use crate::engine::selection::Selection;
use crate::engine::torsion::{set_phi, set_psi};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Expected {expected} residues for {bonds} bonds, found {residues}", expected = .bonds + 1)]
    ResidueCountMismatch { residues: usize, bonds: usize },

    #[error("Bond {index} ({record}) refers to a residue outside the residue list")]
    BondOutOfRange { index: usize, record: BondRecord },

    #[error("Failed to instantiate residue {index} ({name}): {source}")]
    Residue {
        index: usize,
        name: String,
        source: LibraryError,
    },

    #[error("Failed to form bond {index} ({record}): {source}")]
    Bond {
        index: usize,
        record: BondRecord,
        source: RegistryError,
    },

    #[error("Failed to set torsions of bond {index}: {source}")]
    Torsion { index: usize, source: TorsionError },

    #[error("Bonds leave the residues split over {} structures: {}", .handles.len(), .handles.join(", "))]
    DisconnectedLinkage { handles: Vec<String> },

    #[error("Invalid build configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Relaxation error: {0}")]
    Relax(#[from] RelaxError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub output_name: String,
    pub atom_count: usize,
    pub bond_count: usize,
    /// Number of glycosidic bonds formed.
    pub glycosidic_bonds: usize,
    pub relaxation: RelaxReport,
    pub minimized: bool,
}

/// Which transient structure currently holds each residue of the oligomer.
///
/// Residue `k` starts out in its own structure. Every fuse merges the structure holding
/// residue `i` into the one holding residue `j`, after which all residues of the former are
/// reassigned to the latter.
#[derive(Debug, Default)]
struct HandleTable {
    by_residue: Vec<String>,
}

impl HandleTable {
    fn push(&mut self, handle: String) {
        self.by_residue.push(handle);
    }

    fn handle_of(&self, residue_index: usize) -> Option<&str> {
        self.by_residue.get(residue_index).map(String::as_str)
    }

    fn merge(&mut self, consumed: &str, into: &str) {
        for handle in self.by_residue.iter_mut().filter(|h| h.as_str() == consumed) {
            *handle = into.to_string();
        }
    }

    /// Distinct handles, in order of first appearance.
    fn live(&self) -> Vec<String> {
        let mut handles: Vec<String> = Vec::new();
        for handle in &self.by_residue {
            if !handles.contains(handle) {
                handles.push(handle.clone());
            }
        }
        handles
    }

    fn clear(&mut self) {
        self.by_residue.clear();
    }
}

/// Builds with default settings and no progress reporting.
pub fn builder(
    registry: &mut StructureRegistry,
    library: &impl ResidueLibrary,
    residues: &[String],
    bonds: &[BondRecord],
    mol_name: &str,
) -> Result<BuildReport, BuildError> {
    build(
        registry,
        library,
        residues,
        bonds,
        mol_name,
        &BuildConfig::default(),
        &ProgressReporter::new(),
    )
}

/// Builds with the relaxation strategy detected from `config.relax`.
pub fn build(
    registry: &mut StructureRegistry,
    library: &impl ResidueLibrary,
    residues: &[String],
    bonds: &[BondRecord],
    output_name: &str,
    config: &BuildConfig,
    reporter: &ProgressReporter,
) -> Result<BuildReport, BuildError> {
    let strategy = RelaxStrategy::detect(&config.relax);
    build_with_strategy(
        registry,
        library,
        residues,
        bonds,
        output_name,
        config,
        &strategy,
        reporter,
    )
}

/// Assembles the oligosaccharide described by `residues` and `bonds` and stores it in
/// `registry` under `output_name`, replacing any structure of that name.
///
/// Every other structure already in the registry is protected: no selection the build issues
/// can match it, and transient structures are named around it. Registry updates and feedback
/// are suspended for the duration of the build and restored afterwards, whatever the outcome.
/// On failure, transient structures and any partial output are deleted unless
/// `config.keep_transients_on_failure` is set.
///
/// # Errors
///
/// Input errors ([`BuildError::ResidueCountMismatch`], [`BuildError::BondOutOfRange`],
/// [`BuildError::Config`]) are reported before the registry is touched. Later errors identify the residue or bond at fault.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, name = "build_workflow", fields(output = output_name, residues = residues.len()))]
pub fn build_with_strategy(
    registry: &mut StructureRegistry,
    library: &impl ResidueLibrary,
    residues: &[String],
    bonds: &[BondRecord],
    output_name: &str,
    config: &BuildConfig,
    strategy: &RelaxStrategy,
    reporter: &ProgressReporter,
) -> Result<BuildReport, BuildError> {
    validate_inputs(residues, bonds)?;
    config.validate()?;

    let mut registry = registry.suspend_updates();
    let mut handles = HandleTable::default();

    let result = assemble(
        &mut registry,
        library,
        residues,
        bonds,
        output_name,
        config,
        strategy,
        reporter,
        &mut handles,
    );

    if let Err(e) = &result {
        if config.keep_transients_on_failure {
            warn!(handles = ?handles.live(), "Build failed, keeping transient structures: {}", e);
        } else {
            for handle in handles.live() {
                registry.discard(&handle);
            }
            registry.discard(output_name);
            for marker in FUSE_MARKERS {
                registry.delete_marker(marker);
            }
            debug!("Build failed, transient structures removed: {}", e);
        }
    }
    result
}

fn validate_inputs(residues: &[String], bonds: &[BondRecord]) -> Result<(), BuildError> {
    if residues.len() != bonds.len() + 1 {
        return Err(BuildError::ResidueCountMismatch {
            residues: residues.len(),
            bonds: bonds.len(),
        });
    }
    for (index, bond) in bonds.iter().enumerate() {
        if bond.residue_index_i >= residues.len() || bond.residue_index_j >= residues.len() {
            return Err(BuildError::BondOutOfRange {
                index,
                record: bond.clone(),
            });
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    registry: &mut StructureRegistry,
    library: &impl ResidueLibrary,
    residues: &[String],
    bonds: &[BondRecord],
    output_name: &str,
    config: &BuildConfig,
    strategy: &RelaxStrategy,
    reporter: &ProgressReporter,
    handles: &mut HandleTable,
) -> Result<BuildReport, BuildError> {
    if registry.discard(output_name) {
        info!(output = output_name, "Replacing existing structure");
    }
    let protected: Vec<String> = registry.names().map(str::to_string).collect();
    let scope = || Selection::all().excluding_objects(protected.iter().map(String::as_str));

    reporter.phase("Instantiating residues", || {
        instantiate_residues(registry, library, residues, output_name, reporter, handles)
    })?;

    reporter.phase("Forming glycosidic bonds", || {
        reporter.report(Progress::TaskStart {
            total_steps: bonds.len() as u64,
        });
        for (index, bond) in bonds.iter().enumerate() {
            condense(registry, handles, &scope, index, bond)?;
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        Ok::<_, BuildError>(())
    })?;

    let remaining = handles.live();
    if remaining.len() != 1 {
        return Err(BuildError::DisconnectedLinkage { handles: remaining });
    }
    let merged = &remaining[0];
    registry.copy(merged, output_name)?;
    registry.delete(merged)?;
    handles.clear();

    reporter.phase("Setting glycosidic torsions", || -> Result<(), BuildError> {
        registry.modify(output_name, |system| -> Result<(), BuildError> {
            for (index, bond) in bonds.iter().enumerate() {
                set_phi(system, bond, config.phi)
                    .and_then(|()| set_psi(system, bond, config.psi))
                    .map_err(|source| BuildError::Torsion { index, source })?;
            }
            Ok(())
        })?
    })?;

    for marker in FUSE_MARKERS {
        registry.delete_marker(marker);
    }

    let relaxation = reporter.phase("Relaxing geometry", || -> Result<RelaxReport, BuildError> {
        registry
            .modify(output_name, |system| relax(system, strategy, &config.relax))?
            .map_err(BuildError::from)
    })?;

    let system = registry
        .get(output_name)
        .ok_or_else(|| RegistryError::ObjectNotFound {
            name: output_name.to_string(),
        })?;
    let violations = system.valence_violations();
    if !violations.is_empty() {
        warn!(count = violations.len(), "Atoms exceed their maximum valence");
        reporter.report(Progress::Message(format!(
            "{} atoms exceed their maximum valence",
            violations.len()
        )));
    }
    let fragments = system.fragment_count();
    if fragments != 1 {
        warn!(fragments, "Built structure is not a single connected molecule");
        reporter.report(Progress::Message(format!(
            "Built structure has {} disconnected fragments",
            fragments
        )));
    }
    if strategy.minimizes() && relaxation.minimization.is_none() {
        reporter.report(Progress::Message(
            "Minimization backend unavailable; keeping sculpted geometry".to_string(),
        ));
    }
    if relaxation.remaining_contacts > 0 {
        reporter.report(Progress::Message(format!(
            "{} close contacts remain after relaxation",
            relaxation.remaining_contacts
        )));
    }

    let report = BuildReport {
        output_name: output_name.to_string(),
        atom_count: system.atom_count(),
        bond_count: system.bonds().len(),
        glycosidic_bonds: bonds.len(),
        minimized: relaxation.minimization.is_some(),
        relaxation,
    };
    info!(
        atoms = report.atom_count,
        bonds = report.bond_count,
        minimized = report.minimized,
        "Build complete"
    );
    Ok(report)
}

fn instantiate_residues(
    registry: &mut StructureRegistry,
    library: &impl ResidueLibrary,
    residues: &[String],
    output_name: &str,
    reporter: &ProgressReporter,
    handles: &mut HandleTable,
) -> Result<(), BuildError> {
    reporter.report(Progress::TaskStart {
        total_steps: residues.len() as u64,
    });
    for (index, name) in residues.iter().enumerate() {
        let template = library.load(name).map_err(|source| BuildError::Residue {
            index,
            name: name.clone(),
            source,
        })?;
        let handle = registry.unique_name(&index.to_string(), &[output_name]);
        registry.load(&handle, template)?;
        handles.push(handle.clone());

        registry.alter_residue_number(&Selection::all().in_object(&handle), index as isize);
        registry.sort(&handle)?;
        debug!(residue = index, name = %name, handle = %handle, "Residue instantiated");
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    Ok(())
}

/// Removes the leaving atoms of `bond`, fuses its two atoms and retires the consumed handle.
fn condense(
    registry: &mut StructureRegistry,
    handles: &mut HandleTable,
    scope: &impl Fn() -> Selection,
    index: usize,
    bond: &BondRecord,
) -> Result<(), BuildError> {
    let bond_error = |source: RegistryError| BuildError::Bond {
        index,
        record: bond.clone(),
        source,
    };
    let handle = |residue_index: usize| {
        handles
            .handle_of(residue_index)
            .map(str::to_string)
            .ok_or_else(|| BuildError::BondOutOfRange {
                index,
                record: bond.clone(),
            })
    };

    let linkage = bond.linkage();
    let [(residue_i, atom_i), (residue_j, atom_j)] = linkage.fuse_atoms();
    let moving = handle(residue_i)?;
    let anchor = handle(residue_j)?;
    if moving == anchor {
        return Err(bond_error(RegistryError::CyclicLinkage { object: anchor }));
    }

    for group in linkage.leaving_groups() {
        let owner = handle(group.residue_index)?;
        let selection = scope()
            .in_object(&owner)
            .residue(group.residue_index as isize)
            .atom_names(group.atom_names.iter().map(String::as_str));
        let removed = registry.remove_atoms(&selection);
        debug!(bond = index, removed, selection = %selection, "Leaving atoms removed");
    }

    let first = scope()
        .in_object(&moving)
        .residue(residue_i as isize)
        .atom_name(&atom_i);
    let second = scope()
        .in_object(&anchor)
        .residue(residue_j as isize)
        .atom_name(&atom_j);
    let outcome = registry.fuse(&first, &second).map_err(bond_error)?;

    registry.delete(&moving).map_err(bond_error)?;
    handles.merge(&moving, &outcome.object);
    debug!(bond = index, record = %bond, into = %outcome.object, "Glycosidic bond formed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn validate_rejects_wrong_residue_count() {
        let bonds = vec![BondRecord::new(0, "GLC", 1, "GLC", 1, 4)];
        let result = validate_inputs(&names(&["GLC"]), &bonds);
        assert!(matches!(
            result,
            Err(BuildError::ResidueCountMismatch {
                residues: 1,
                bonds: 1
            })
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_bond() {
        let bonds = vec![BondRecord::new(0, "GLC", 2, "GLC", 1, 4)];
        let result = validate_inputs(&names(&["GLC", "GLC"]), &bonds);
        assert!(matches!(
            result,
            Err(BuildError::BondOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn handle_table_merges_and_lists_live_handles() {
        let mut table = HandleTable::default();
        for handle in ["0", "1", "2"] {
            table.push(handle.to_string());
        }

        table.merge("0", "1");
        assert_eq!(table.handle_of(0), Some("1"));
        assert_eq!(table.live(), vec!["1".to_string(), "2".to_string()]);

        table.merge("1", "2");
        assert_eq!(table.live(), vec!["2".to_string()]);
        assert_eq!(table.handle_of(3), None);
    }

    #[test]
    fn error_messages_name_the_culprit() {
        let error = BuildError::ResidueCountMismatch {
            residues: 3,
            bonds: 1,
        };
        assert_eq!(
            error.to_string(),
            "Expected 2 residues for 1 bonds, found 3"
        );

        let error = BuildError::DisconnectedLinkage {
            handles: vec!["1".into(), "2".into()],
        };
        assert_eq!(
            error.to_string(),
            "Bonds leave the residues split over 2 structures: 1, 2"
        );
    }
}
