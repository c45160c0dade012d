use std::collections::BTreeSet;
use std::fmt;

/// A typed atom selection over the structures of a [`StructureRegistry`].
///
/// A selection is the conjunction of up to four predicates: the owning structure must be in
/// the include set (if one is given) and not in the exclude set, the residue number must be in
/// the residue set (if given), and the atom name must be in the name set (if given). An empty
/// selection matches every atom of every structure.
///
/// [`StructureRegistry`]: super::registry::StructureRegistry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    include_objects: Option<BTreeSet<String>>,
    exclude_objects: BTreeSet<String>,
    residues: Option<BTreeSet<isize>>,
    atom_names: Option<BTreeSet<String>>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the selection to the structure `name`.
    pub fn in_object(self, name: &str) -> Self {
        self.in_objects([name])
    }

    pub fn in_objects<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.include_objects
            .get_or_insert_with(BTreeSet::new)
            .extend(names.into_iter().map(str::to_string));
        self
    }

    /// Never match atoms of the given structures.
    pub fn excluding_objects<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.exclude_objects
            .extend(names.into_iter().map(str::to_string));
        self
    }

    pub fn residue(self, residue_number: isize) -> Self {
        self.residues([residue_number])
    }

    pub fn residues(mut self, numbers: impl IntoIterator<Item = isize>) -> Self {
        self.residues
            .get_or_insert_with(BTreeSet::new)
            .extend(numbers);
        self
    }

    pub fn atom_name(self, name: &str) -> Self {
        self.atom_names([name])
    }

    pub fn atom_names<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.atom_names
            .get_or_insert_with(BTreeSet::new)
            .extend(names.into_iter().map(str::to_string));
        self
    }

    pub fn matches_object(&self, object: &str) -> bool {
        !self.exclude_objects.contains(object)
            && self
                .include_objects
                .as_ref()
                .is_none_or(|include| include.contains(object))
    }

    pub fn matches_atom(&self, residue_number: isize, atom_name: &str) -> bool {
        self.residues
            .as_ref()
            .is_none_or(|residues| residues.contains(&residue_number))
            && self
                .atom_names
                .as_ref()
                .is_none_or(|names| names.contains(atom_name))
    }
}

fn join<T: fmt::Display>(items: &BTreeSet<T>, separator: &str) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Renders the selection in the familiar `object A and resi 1 and name O1+H1o and not (B)`
/// form, for logs and error messages.
impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses = Vec::new();
        if let Some(include) = &self.include_objects {
            clauses.push(format!("object {}", join(include, "+")));
        }
        if let Some(residues) = &self.residues {
            clauses.push(format!("resi {}", join(residues, "+")));
        }
        if let Some(names) = &self.atom_names {
            clauses.push(format!("name {}", join(names, "+")));
        }
        if !self.exclude_objects.is_empty() {
            clauses.push(format!("not ({})", join(&self.exclude_objects, " or ")));
        }
        if clauses.is_empty() {
            write!(f, "all")
        } else {
            write!(f, "{}", clauses.join(" and "))
        }
    }
}
