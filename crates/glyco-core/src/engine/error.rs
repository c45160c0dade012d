use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No structure or marker named '{name}'")]
    ObjectNotFound { name: String },

    #[error("Selection '{selection}' must match exactly one atom, matched {count}")]
    UnresolvedSelection { selection: String, count: usize },

    #[error("Cannot fuse two atoms of the same structure '{object}'; the linkage closes a cycle")]
    CyclicLinkage { object: String },

    #[error("Name '{name}' is already in use")]
    NameInUse { name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TorsionError {
    #[error("No residue with index {residue_index} in the structure")]
    ResidueNotFound { residue_index: usize },

    #[error("Residue {residue_index} has no atom named '{atom_name}'")]
    AtomNotFound {
        residue_index: usize,
        atom_name: String,
    },

    #[error("Bond {atom1}-{atom2} lies in a ring and cannot be rotated")]
    RingBond { atom1: String, atom2: String },

    #[error("Torsion {torsion} is undefined for collinear atoms")]
    DegenerateGeometry { torsion: &'static str },
}

#[derive(Debug, Error)]
pub enum RelaxError {
    #[error("Minimization backend '{backend}' is unavailable")]
    BackendUnavailable { backend: String },

    #[error("No structure named '{name}' to relax")]
    ObjectNotFound { name: String },

    #[error("Minimization diverged at step {step}")]
    Diverged { step: usize },
}
