use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chemical elements found in carbohydrate templates and their common substituents.
///
/// The radii drive bond perception for templates without `CONECT` records, the ideal
/// lengths of newly formed glycosidic bonds and the excluded-volume term of the relaxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    H,
    C,
    N,
    O,
    P,
    S,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl Element {
    /// Single-bond covalent radius in Angstroms.
    pub fn covalent_radius(self) -> f64 {
        match self {
            Element::H => 0.31,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::P => 1.07,
            Element::S => 1.05,
        }
    }

    /// Bondi van der Waals radius in Angstroms.
    pub fn vdw_radius(self) -> f64 {
        match self {
            Element::H => 1.20,
            Element::C => 1.70,
            Element::N => 1.55,
            Element::O => 1.52,
            Element::P => 1.80,
            Element::S => 1.80,
        }
    }

    /// Largest number of covalent partners accepted by the valence check.
    pub fn max_valence(self) -> usize {
        match self {
            Element::H => 1,
            Element::C => 4,
            Element::N => 4,
            Element::O => 2,
            Element::P => 5,
            Element::S => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Element::H => "H",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::P => "P",
            Element::S => "S",
        }
    }

    /// Infers the element from an atom name following the `<Element><position>[suffix]`
    /// convention, e.g. `C1`, `O5`, `H4o`, `H61`.
    pub fn from_atom_name(name: &str) -> Option<Self> {
        let first = name.trim().chars().find(|c| c.is_ascii_alphabetic())?;
        first.to_string().parse().ok()
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" | "D" => Ok(Element::H),
            "C" => Ok(Element::C),
            "N" => Ok(Element::N),
            "O" => Ok(Element::O),
            "P" => Ok(Element::P),
            "S" => Ok(Element::S),
            _ => Err(ParseElementError(s.to_string())),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
