use super::error::RegistryError;
use super::selection::Selection;
use crate::core::io::sorting::sorter::apply_canonical_order;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::{open_valence_direction, rotation_to_align};
use nalgebra::{Isometry3, Point3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Deref, DerefMut};
use tracing::{debug, info};

/// Name of the marker on the moved atom of the most recent fuse.
pub const MARKER_ATOM_1: &str = "pk1";
/// Name of the marker on the stationary atom of the most recent fuse.
pub const MARKER_ATOM_2: &str = "pk2";
pub const MARKER_BOND: &str = "pkbond";
pub const MARKER_OBJECT: &str = "pkmol";
pub const FUSE_MARKERS: [&str; 4] = [MARKER_ATOM_1, MARKER_ATOM_2, MARKER_BOND, MARKER_OBJECT];

/// Cached per-structure summary, refreshed on every change while updates are live.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureSummary {
    pub atom_count: usize,
    pub bond_count: usize,
    pub centroid: Point3<f64>,
}

impl StructureSummary {
    fn of(system: &MolecularSystem) -> Self {
        let atom_count = system.atom_count();
        let centroid = if atom_count == 0 {
            Point3::origin()
        } else {
            let sum: Vector3<f64> = system.atoms_iter().map(|(_, a)| a.position.coords).sum();
            Point3::from(sum / atom_count as f64)
        };
        Self {
            atom_count,
            bond_count: system.bonds().len(),
            centroid,
        }
    }
}

/// A named pointer into a structure, created by [`StructureRegistry::fuse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Atom { object: String, atom: AtomId },
    Bond { object: String, atoms: (AtomId, AtomId) },
    Object { object: String },
}

impl Marker {
    pub fn object(&self) -> &str {
        match self {
            Marker::Atom { object, .. } | Marker::Bond { object, .. } | Marker::Object { object } => {
                object
            }
        }
    }

    fn object_mut(&mut self) -> &mut String {
        match self {
            Marker::Atom { object, .. } | Marker::Bond { object, .. } | Marker::Object { object } => {
                object
            }
        }
    }
}

/// Result of a successful [`StructureRegistry::fuse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuseOutcome {
    /// Structure that now holds both fused atoms.
    pub object: String,
    /// The copy of the first selected atom inside `object`.
    pub moved_atom: AtomId,
    /// The second selected atom.
    pub anchor_atom: AtomId,
}

#[derive(Debug, Clone)]
struct Entry {
    system: MolecularSystem,
    summary: StructureSummary,
    stale: bool,
}

/// The namespace in which structures are assembled.
///
/// Structures are stored under unique names, in creation order. Besides structures the
/// registry holds the `pk1`/`pk2`/`pkbond`/`pkmol` markers left behind by [`fuse`]. While live
/// updates are on, every mutation refreshes the structure's [`StructureSummary`]; while they
/// are suspended summaries are only marked stale and refreshed in one go on resume. With
/// feedback on, every action is logged at `info` level, otherwise at `debug`.
///
/// [`fuse`]: StructureRegistry::fuse
#[derive(Debug, Clone)]
pub struct StructureRegistry {
    order: Vec<String>,
    objects: HashMap<String, Entry>,
    markers: HashMap<String, Marker>,
    live_updates: bool,
    feedback: bool,
}

impl Default for StructureRegistry {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            objects: HashMap::new(),
            markers: HashMap::new(),
            live_updates: true,
            feedback: true,
        }
    }
}

impl StructureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn announce(&self, action: fmt::Arguments<'_>) {
        if self.feedback {
            info!("{}", action);
        } else {
            debug!("{}", action);
        }
    }

    fn touch(&mut self, name: &str) {
        let live = self.live_updates;
        if let Some(entry) = self.objects.get_mut(name) {
            if live {
                entry.summary = StructureSummary::of(&entry.system);
                entry.stale = false;
            } else {
                entry.stale = true;
            }
        }
    }

    fn entry(&self, name: &str) -> Result<&Entry, RegistryError> {
        self.objects
            .get(name)
            .ok_or_else(|| RegistryError::ObjectNotFound {
                name: name.to_string(),
            })
    }

    fn ensure_free(&self, name: &str) -> Result<(), RegistryError> {
        if self.is_taken(name) {
            Err(RegistryError::NameInUse {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn insert(&mut self, name: &str, system: MolecularSystem) {
        let summary = StructureSummary::of(&system);
        self.objects.insert(
            name.to_string(),
            Entry {
                system,
                summary,
                stale: false,
            },
        );
        self.order.push(name.to_string());
    }

    /// Stores `system` under `name`, recording every atom's current position as its reference
    /// geometry.
    pub fn load(&mut self, name: &str, mut system: MolecularSystem) -> Result<(), RegistryError> {
        self.ensure_free(name)?;
        system.capture_reference_geometry();
        self.insert(name, system);
        self.announce(format_args!("Loaded structure '{}'", name));
        Ok(())
    }

    /// `true` if a structure (not a marker) is stored under `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.contains_key(name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.exists(name) || self.has_marker(name)
    }

    /// Structure names in creation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&MolecularSystem> {
        self.objects.get(name).map(|entry| &entry.system)
    }

    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.get(name)
    }

    /// Runs `action` on the structure `name`, then refreshes (or invalidates) its summary.
    pub fn modify<R>(
        &mut self,
        name: &str,
        action: impl FnOnce(&mut MolecularSystem) -> R,
    ) -> Result<R, RegistryError> {
        let entry = self
            .objects
            .get_mut(name)
            .ok_or_else(|| RegistryError::ObjectNotFound {
                name: name.to_string(),
            })?;
        let result = action(&mut entry.system);
        self.touch(name);
        Ok(result)
    }

    /// Cached summary of `name`; may be stale while updates are suspended.
    pub fn summary(&self, name: &str) -> Option<&StructureSummary> {
        self.objects.get(name).map(|entry| &entry.summary)
    }

    pub fn is_stale(&self, name: &str) -> bool {
        self.objects.get(name).is_some_and(|entry| entry.stale)
    }

    /// Returns `preferred` if nothing is stored under it and it is not in `reserved`,
    /// otherwise the first free `preferred_NN`.
    pub fn unique_name(&self, preferred: &str, reserved: &[&str]) -> String {
        let is_free = |name: &str| !self.is_taken(name) && !reserved.contains(&name);
        if is_free(preferred) {
            return preferred.to_string();
        }
        (1..)
            .map(|n| format!("{}_{:02}", preferred, n))
            .find(|candidate| is_free(candidate))
            .unwrap_or_else(|| preferred.to_string())
    }

    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), RegistryError> {
        if old == new {
            return self.entry(old).map(|_| ());
        }
        self.ensure_free(new)?;
        let entry = self
            .objects
            .remove(old)
            .ok_or_else(|| RegistryError::ObjectNotFound {
                name: old.to_string(),
            })?;
        self.objects.insert(new.to_string(), entry);
        for slot in self.order.iter_mut().filter(|slot| slot.as_str() == old) {
            *slot = new.to_string();
        }
        for marker in self.markers.values_mut() {
            if marker.object() == old {
                *marker.object_mut() = new.to_string();
            }
        }
        self.announce(format_args!("Renamed structure '{}' to '{}'", old, new));
        Ok(())
    }

    /// Deep-copies structure `source` to the new name `target`.
    pub fn copy(&mut self, source: &str, target: &str) -> Result<(), RegistryError> {
        self.ensure_free(target)?;
        let system = self.entry(source)?.system.clone();
        self.insert(target, system);
        self.announce(format_args!("Copied structure '{}' to '{}'", source, target));
        Ok(())
    }

    /// Deletes the structure or marker `name`. Deleting a structure also drops the markers
    /// pointing into it.
    pub fn delete(&mut self, name: &str) -> Result<(), RegistryError> {
        if self.markers.remove(name).is_some() {
            self.announce(format_args!("Deleted marker '{}'", name));
            return Ok(());
        }
        if self.objects.remove(name).is_none() {
            return Err(RegistryError::ObjectNotFound {
                name: name.to_string(),
            });
        }
        self.order.retain(|slot| slot != name);
        self.markers.retain(|_, marker| marker.object() != name);
        self.announce(format_args!("Deleted structure '{}'", name));
        Ok(())
    }

    /// Removes the marker `name` and nothing else; a structure of the same name survives.
    /// Returns whether a marker was removed.
    pub fn delete_marker(&mut self, name: &str) -> bool {
        let removed = self.markers.remove(name).is_some();
        if removed {
            self.announce(format_args!("Deleted marker '{}'", name));
        }
        removed
    }

    /// Like [`delete`](Self::delete), but a missing name is not an error. Returns whether
    /// anything was deleted.
    pub fn discard(&mut self, name: &str) -> bool {
        self.delete(name).is_ok()
    }

    /// All atoms matching `selection`, in structure creation order and then atom order.
    pub fn select(&self, selection: &Selection) -> Vec<(String, AtomId)> {
        let mut matches = Vec::new();
        for name in self.order.iter().filter(|name| selection.matches_object(name)) {
            let Some(entry) = self.objects.get(name) else {
                continue;
            };
            let system = &entry.system;
            for (atom_id, atom) in system.atoms_iter() {
                let Some(residue_number) = system.residue_number_of(atom_id) else {
                    continue;
                };
                if selection.matches_atom(residue_number, &atom.name) {
                    matches.push((name.clone(), atom_id));
                }
            }
        }
        matches
    }

    pub fn count(&self, selection: &Selection) -> usize {
        self.select(selection).len()
    }

    /// Sets the residue number of every residue that owns a selected atom. Returns the number
    /// of residues changed.
    pub fn alter_residue_number(&mut self, selection: &Selection, residue_number: isize) -> usize {
        let mut by_object: HashMap<String, HashSet<AtomId>> = HashMap::new();
        for (object, atom_id) in self.select(selection) {
            by_object.entry(object).or_default().insert(atom_id);
        }

        let mut altered = 0;
        for (object, atoms) in by_object {
            let Some(entry) = self.objects.get_mut(&object) else {
                continue;
            };
            let residue_ids: HashSet<_> = atoms
                .iter()
                .filter_map(|&id| entry.system.atom(id).map(|atom| atom.residue_id))
                .collect();
            for residue_id in residue_ids {
                if let Some(residue) = entry.system.residue_mut(residue_id) {
                    residue.residue_number = residue_number;
                    altered += 1;
                }
            }
            self.touch(&object);
        }
        self.announce(format_args!(
            "Altered {} residues of ({}) to resi {}",
            altered, selection, residue_number
        ));
        altered
    }

    /// Puts the atoms of structure `name` into canonical order.
    pub fn sort(&mut self, name: &str) -> Result<(), RegistryError> {
        self.modify(name, apply_canonical_order)?;
        self.announce(format_args!("Sorted structure '{}'", name));
        Ok(())
    }

    /// Removes every selected atom together with its bonds. Returns the number removed.
    pub fn remove_atoms(&mut self, selection: &Selection) -> usize {
        let matches = self.select(selection);
        let mut touched = HashSet::new();
        for (object, atom_id) in &matches {
            if let Some(entry) = self.objects.get_mut(object) {
                entry.system.remove_atom(*atom_id);
                touched.insert(object.clone());
            }
        }
        for object in touched {
            self.touch(&object);
        }
        self.announce(format_args!("Removed {} atoms ({})", matches.len(), selection));
        matches.len()
    }

    fn resolve_single(&self, selection: &Selection) -> Result<(String, AtomId), RegistryError> {
        let mut matches = self.select(selection);
        if matches.len() != 1 {
            return Err(RegistryError::UnresolvedSelection {
                selection: selection.to_string(),
                count: matches.len(),
            });
        }
        Ok(matches.remove(0))
    }

    /// Joins the structures of two single-atom selections with a new single bond.
    ///
    /// A copy of the structure holding the first atom is rigidly moved so that its atom sits at
    /// the ideal covalent distance from the second atom, along the second atom's open valence,
    /// with its own open valence pointing back. The copy is then merged into the second atom's
    /// structure; the first structure itself is left untouched. Afterwards `pk1` and `pk2`
    /// mark the two atoms, `pkbond` the new bond and `pkmol` the merged structure.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnresolvedSelection`] if a selection does not match exactly one atom,
    /// [`RegistryError::CyclicLinkage`] if both atoms already share a structure.
    pub fn fuse(
        &mut self,
        first: &Selection,
        second: &Selection,
    ) -> Result<FuseOutcome, RegistryError> {
        let (moving_object, moving_atom) = self.resolve_single(first)?;
        let (anchor_object, anchor_atom) = self.resolve_single(second)?;
        if moving_object == anchor_object {
            return Err(RegistryError::CyclicLinkage {
                object: anchor_object,
            });
        }

        let mut fragment = self.entry(&moving_object)?.system.clone();
        let anchor_system = &self.entry(&anchor_object)?.system;
        let placement = fuse_placement(&fragment, moving_atom, anchor_system, anchor_atom)
            .ok_or_else(|| RegistryError::ObjectNotFound {
                name: moving_object.clone(),
            })?;
        fragment.transform(&placement);

        let entry = self
            .objects
            .get_mut(&anchor_object)
            .ok_or_else(|| RegistryError::ObjectNotFound {
                name: anchor_object.clone(),
            })?;
        let atom_map = entry.system.absorb(fragment);
        let moved_atom = atom_map
            .get(&moving_atom)
            .copied()
            .ok_or_else(|| RegistryError::ObjectNotFound {
                name: moving_object.clone(),
            })?;
        entry
            .system
            .add_bond(moved_atom, anchor_atom, BondOrder::Single);
        self.touch(&anchor_object);

        self.markers.insert(
            MARKER_ATOM_1.to_string(),
            Marker::Atom {
                object: anchor_object.clone(),
                atom: moved_atom,
            },
        );
        self.markers.insert(
            MARKER_ATOM_2.to_string(),
            Marker::Atom {
                object: anchor_object.clone(),
                atom: anchor_atom,
            },
        );
        self.markers.insert(
            MARKER_BOND.to_string(),
            Marker::Bond {
                object: anchor_object.clone(),
                atoms: (moved_atom, anchor_atom),
            },
        );
        self.markers.insert(
            MARKER_OBJECT.to_string(),
            Marker::Object {
                object: anchor_object.clone(),
            },
        );

        self.announce(format_args!(
            "Fused ({}) onto ({}) in '{}'",
            first, second, anchor_object
        ));
        Ok(FuseOutcome {
            object: anchor_object,
            moved_atom,
            anchor_atom,
        })
    }

    pub fn updates_live(&self) -> bool {
        self.live_updates
    }

    pub fn feedback_enabled(&self) -> bool {
        self.feedback
    }

    pub fn set_feedback(&mut self, enabled: bool) {
        self.feedback = enabled;
    }

    /// Turns live updates on or off. Turning them on refreshes every stale summary.
    pub fn set_live_updates(&mut self, enabled: bool) {
        self.live_updates = enabled;
        if enabled {
            for entry in self.objects.values_mut().filter(|entry| entry.stale) {
                entry.summary = StructureSummary::of(&entry.system);
                entry.stale = false;
            }
        }
    }

    /// Suspends live updates and action feedback until the returned guard is dropped, which
    /// restores both to their previous values on every exit path.
    pub fn suspend_updates(&mut self) -> UpdateGuard<'_> {
        let previous = (self.live_updates, self.feedback);
        self.set_live_updates(false);
        self.set_feedback(false);
        UpdateGuard {
            registry: self,
            previous,
        }
    }
}

/// Rigid transformation that places `moving_atom` of `fragment` at bonding distance from
/// `anchor_atom` of `anchor`, open valence facing open valence.
fn fuse_placement(
    fragment: &MolecularSystem,
    moving_atom: AtomId,
    anchor: &MolecularSystem,
    anchor_atom: AtomId,
) -> Option<Isometry3<f64>> {
    let moving = fragment.atom(moving_atom)?;
    let fixed = anchor.atom(anchor_atom)?;

    let neighbor_positions = |system: &MolecularSystem, id: AtomId| -> Vec<Point3<f64>> {
        system
            .get_bonded_neighbors(id)
            .unwrap_or_default()
            .iter()
            .filter_map(|&n| system.atom(n).map(|atom| atom.position))
            .collect()
    };

    let moving_dir =
        open_valence_direction(&moving.position, &neighbor_positions(fragment, moving_atom));
    let anchor_dir = open_valence_direction(&fixed.position, &neighbor_positions(anchor, anchor_atom));

    let rotation = rotation_to_align(&moving_dir, &-anchor_dir).unwrap_or_else(|| {
        // Antiparallel input: any half turn about a perpendicular axis aligns them.
        let helper = if moving_dir.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        Rotation3::from_axis_angle(
            &Unit::new_normalize(moving_dir.cross(&helper)),
            std::f64::consts::PI,
        )
    });

    let bond_length = moving.element.covalent_radius() + fixed.element.covalent_radius();
    let target = fixed.position + anchor_dir * bond_length;
    let translation = target.coords - rotation * moving.position.coords;

    Some(Isometry3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

/// Scoped suspension of live updates and feedback, see
/// [`StructureRegistry::suspend_updates`].
pub struct UpdateGuard<'a> {
    registry: &'a mut StructureRegistry,
    previous: (bool, bool),
}

impl Deref for UpdateGuard<'_> {
    type Target = StructureRegistry;

    fn deref(&self) -> &Self::Target {
        self.registry
    }
}

impl DerefMut for UpdateGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.registry
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        let (live, feedback) = self.previous;
        self.registry.set_feedback(feedback);
        self.registry.set_live_updates(live);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::residues::library::{DirectoryLibrary, ResidueLibrary};

    fn glucose() -> MolecularSystem {
        DirectoryLibrary::bundled().load("GLC").unwrap()
    }

    fn registry_with(names: &[&str]) -> StructureRegistry {
        let mut registry = StructureRegistry::new();
        for name in names {
            registry.load(name, glucose()).unwrap();
        }
        registry
    }

    #[test]
    fn load_captures_reference_geometry_and_rejects_duplicates() {
        let mut registry = registry_with(&["a"]);

        let system = registry.get("a").unwrap();
        assert!(
            system
                .atoms_iter()
                .all(|(_, atom)| atom.reference_position == Some(atom.position))
        );
        assert_eq!(
            registry.load("a", glucose()),
            Err(RegistryError::NameInUse { name: "a".into() })
        );
    }

    #[test]
    fn unique_name_skips_taken_and_reserved_names() {
        let registry = registry_with(&["0", "0_01"]);
        assert_eq!(registry.unique_name("1", &[]), "1");
        assert_eq!(registry.unique_name("0", &[]), "0_02");
        assert_eq!(registry.unique_name("1", &["1"]), "1_01");
    }

    #[test]
    fn rename_copy_and_delete_keep_names_consistent() {
        let mut registry = registry_with(&["a", "b"]);

        registry.rename("a", "c").unwrap();
        registry.copy("c", "d").unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["c", "b", "d"]);
        assert_eq!(
            registry.rename("b", "d"),
            Err(RegistryError::NameInUse { name: "d".into() })
        );

        registry.delete("c").unwrap();
        assert!(!registry.exists("c"));
        assert_eq!(
            registry.delete("c"),
            Err(RegistryError::ObjectNotFound { name: "c".into() })
        );
        assert!(!registry.discard("c"));
        assert_eq!(registry.get("d").unwrap().atom_count(), 24);
    }

    #[test]
    fn selections_respect_object_predicates() {
        let mut registry = registry_with(&["0", "1"]);
        registry.alter_residue_number(&Selection::all().in_object("0"), 0);
        registry.alter_residue_number(&Selection::all().in_object("1"), 1);

        let o1_anywhere = Selection::all().atom_name("O1");
        assert_eq!(registry.count(&o1_anywhere), 2);
        let o1_in_1 = o1_anywhere.clone().residue(1);
        assert_eq!(registry.select(&o1_in_1)[0].0, "1");
        assert_eq!(
            registry.count(&o1_anywhere.excluding_objects(["0"])),
            1
        );
    }

    #[test]
    fn remove_atoms_deletes_only_selected_atoms() {
        let mut registry = registry_with(&["0", "keep"]);
        let selection = Selection::all()
            .atom_names(["O1", "H1o"])
            .excluding_objects(["keep"]);

        assert_eq!(registry.remove_atoms(&selection), 2);
        assert_eq!(registry.get("0").unwrap().atom_count(), 22);
        assert_eq!(registry.get("keep").unwrap().atom_count(), 24);
        assert_eq!(registry.summary("0").unwrap().atom_count, 22);
    }

    #[test]
    fn fuse_merges_copy_and_sets_markers() {
        let mut registry = registry_with(&["0", "1"]);
        registry.alter_residue_number(&Selection::all().in_object("0"), 0);
        registry.alter_residue_number(&Selection::all().in_object("1"), 1);
        registry.remove_atoms(&Selection::all().in_object("0").atom_names(["O1", "H1o"]));
        registry.remove_atoms(&Selection::all().in_object("1").atom_name("H4o"));

        let outcome = registry
            .fuse(
                &Selection::all().in_object("0").residue(0).atom_name("C1"),
                &Selection::all().in_object("1").residue(1).atom_name("O4"),
            )
            .unwrap();

        assert_eq!(outcome.object, "1");
        assert_eq!(registry.get("0").unwrap().atom_count(), 22);
        let merged = registry.get("1").unwrap();
        assert_eq!(merged.atom_count(), 45);
        assert_eq!(merged.fragment_count(), 1);
        assert!(merged.are_bonded(outcome.moved_atom, outcome.anchor_atom));

        let c1 = merged.atom(outcome.moved_atom).unwrap().position;
        let o4 = merged.atom(outcome.anchor_atom).unwrap().position;
        assert!(((c1 - o4).norm() - 1.42).abs() < 1e-6);

        for marker in FUSE_MARKERS {
            assert_eq!(registry.marker(marker).unwrap().object(), "1");
        }
        registry.delete("1").unwrap();
        assert!(FUSE_MARKERS.iter().all(|m| !registry.has_marker(m)));
    }

    #[test]
    fn delete_marker_leaves_same_named_structures_alone() {
        let mut registry = registry_with(&["pk1", "0", "1"]);
        registry.remove_atoms(&Selection::all().in_object("0").atom_names(["O1", "H1o"]));
        registry.remove_atoms(&Selection::all().in_object("1").atom_name("H4o"));
        registry
            .fuse(
                &Selection::all().in_object("0").atom_name("C1"),
                &Selection::all().in_object("1").atom_name("O4"),
            )
            .unwrap();

        assert!(registry.delete_marker("pk1"));
        assert!(!registry.has_marker("pk1"));
        assert!(registry.exists("pk1"));
        assert!(!registry.delete_marker("pk1"));
        assert!(registry.exists("pk1"));
    }

    #[test]
    fn fuse_requires_single_atom_selections() {
        let mut registry = registry_with(&["0", "1"]);
        let result = registry.fuse(
            &Selection::all().in_object("0").atom_name("C1"),
            &Selection::all().atom_name("O4"),
        );
        assert_eq!(
            result,
            Err(RegistryError::UnresolvedSelection {
                selection: "name O4".into(),
                count: 2
            })
        );
    }

    #[test]
    fn fuse_within_one_structure_is_cyclic() {
        let mut registry = registry_with(&["0"]);
        let result = registry.fuse(
            &Selection::all().atom_name("C1"),
            &Selection::all().atom_name("O4"),
        );
        assert_eq!(
            result,
            Err(RegistryError::CyclicLinkage { object: "0".into() })
        );
    }

    #[test]
    fn suspended_updates_mark_summaries_stale_until_guard_drops() {
        let mut registry = registry_with(&["0"]);
        assert!(registry.updates_live());
        assert!(registry.feedback_enabled());

        {
            let mut guard = registry.suspend_updates();
            assert!(!guard.updates_live());
            assert!(!guard.feedback_enabled());
            guard.remove_atoms(&Selection::all().atom_name("H1o"));
            assert!(guard.is_stale("0"));
            assert_eq!(guard.summary("0").unwrap().atom_count, 24);
        }

        assert!(registry.updates_live());
        assert!(registry.feedback_enabled());
        assert!(!registry.is_stale("0"));
        assert_eq!(registry.summary("0").unwrap().atom_count, 23);
    }

    #[test]
    fn guard_restores_state_after_panic() {
        let mut registry = registry_with(&["0"]);
        registry.set_feedback(false);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = registry.suspend_updates();
            panic!("build blew up");
        }));

        assert!(result.is_err());
        assert!(registry.updates_live());
        assert!(!registry.feedback_enabled());
    }
}
