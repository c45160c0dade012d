use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::traits::MolecularFile;
use crate::core::models::system::MolecularSystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Residue template '{name}' not found in library")]
    ResidueNotFound { name: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid template file '{path}': {source}")]
    Pdb { path: String, source: PdbError },
}

/// A source of monosaccharide template structures, keyed by residue name (e.g. `GLC`).
pub trait ResidueLibrary {
    /// Returns a fresh, independently owned copy of the template named `name`.
    fn load(&self, name: &str) -> Result<MolecularSystem, LibraryError>;

    fn contains(&self, name: &str) -> bool;
}

/// Library backed by a directory of `<NAME>.pdb` files.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The GLC, GAL and MAN templates shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data/db_glycans"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the template `name` would be read from, or `None` if `name` cannot be a file stem.
    pub fn template_path(&self, name: &str) -> Option<PathBuf> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| self.root.join(format!("{}.pdb", name)))
    }
}

impl ResidueLibrary for DirectoryLibrary {
    fn load(&self, name: &str) -> Result<MolecularSystem, LibraryError> {
        let path = self
            .template_path(name)
            .filter(|path| path.is_file())
            .ok_or_else(|| LibraryError::ResidueNotFound {
                name: name.to_string(),
            })?;

        debug!("Loading residue template '{}' from {}", name, path.display());
        match PdbFile::read_from_path(&path) {
            Ok((system, _)) => Ok(system),
            Err(PdbError::Io(source)) => Err(LibraryError::Io {
                path: path.to_string_lossy().to_string(),
                source,
            }),
            Err(source) => Err(LibraryError::Pdb {
                path: path.to_string_lossy().to_string(),
                source,
            }),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.template_path(name).is_some_and(|path| path.is_file())
    }
}

/// Library holding templates in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    templates: HashMap<String, MolecularSystem>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, template: MolecularSystem) -> Option<MolecularSystem> {
        self.templates.insert(name.to_string(), template)
    }

    /// Reads every template of `other` into memory.
    pub fn preload(other: &impl ResidueLibrary, names: &[&str]) -> Result<Self, LibraryError> {
        let mut library = Self::new();
        for name in names {
            library.insert(name, other.load(name)?);
        }
        Ok(library)
    }
}

impl ResidueLibrary for InMemoryLibrary {
    fn load(&self, name: &str) -> Result<MolecularSystem, LibraryError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| LibraryError::ResidueNotFound {
                name: name.to_string(),
            })
    }

    fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bundled_library_provides_shipped_templates() {
        let library = DirectoryLibrary::bundled();
        for name in ["GLC", "GAL", "MAN"] {
            assert!(library.contains(name), "missing {}", name);
            let system = library.load(name).unwrap();
            assert_eq!(system.atom_count(), 24);
        }
    }

    #[test]
    fn unknown_residue_is_not_found() {
        let library = DirectoryLibrary::bundled();
        assert!(!library.contains("XYZ"));
        assert!(matches!(
            library.load("XYZ"),
            Err(LibraryError::ResidueNotFound { name }) if name == "XYZ"
        ));
    }

    #[test]
    fn names_that_are_not_file_stems_are_rejected() {
        let library = DirectoryLibrary::bundled();
        assert!(library.template_path("../GLC").is_none());
        assert!(library.template_path("").is_none());
        assert!(matches!(
            library.load("../GLC"),
            Err(LibraryError::ResidueNotFound { .. })
        ));
    }

    #[test]
    fn corrupt_template_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BAD.pdb"), "REMARK nothing\nEND\n").unwrap();
        let library = DirectoryLibrary::new(dir.path());

        match library.load("BAD") {
            Err(LibraryError::Pdb { path, .. }) => assert!(path.ends_with("BAD.pdb")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn in_memory_library_returns_independent_copies() {
        let library = InMemoryLibrary::preload(&DirectoryLibrary::bundled(), &["GLC"]).unwrap();
        let mut first = library.load("GLC").unwrap();
        let c1 = first.find_atom(1, "C1").unwrap();
        first.remove_atom(c1);

        let second = library.load("GLC").unwrap();
        assert_eq!(first.atom_count(), 23);
        assert_eq!(second.atom_count(), 24);
        assert!(matches!(
            library.load("GAL"),
            Err(LibraryError::ResidueNotFound { .. })
        ));
    }
}
