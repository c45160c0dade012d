use super::element::Element;
use super::ids::ResidueId;
use nalgebra::Point3;

/// Represents an atom of a monosaccharide template or an assembled oligosaccharide.
///
/// Besides its current coordinates, every atom remembers where it sat when its structure was
/// first loaded. Sculpting uses that reference geometry to restore bond lengths, angles and
/// ring shape after fusing.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "C1", "O5", "H4o").
    pub name: String,
    /// The chemical element.
    pub element: Element,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The serial number read from, or assigned for, a structure file.
    pub serial: usize,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The coordinates the atom had when its structure was loaded into a registry.
    pub reference_position: Option<Point3<f64>>,
}

impl Atom {
    /// Creates a new `Atom` without a reference position and with serial `0`.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `element` - The chemical element.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, element: Element, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element,
            residue_id,
            serial: 0,
            position,
            reference_position: None,
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element == Element::H
    }
}
