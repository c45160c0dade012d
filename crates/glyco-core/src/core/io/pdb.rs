use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

/// Slack added to the sum of covalent radii when perceiving bonds from coordinates.
const BOND_TOLERANCE: f64 = 0.4;
/// Pairs closer than this are treated as overlapping atoms, not bonds.
const MIN_BOND_DISTANCE: f64 = 0.4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// `HEADER`, `TITLE`, `COMPND` and `REMARK` lines, verbatim and in file order.
    pub header_lines: Vec<String>,
    /// Whether connectivity was perceived from distances because the file had no `CONECT`.
    pub bonds_inferred: bool,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Cannot determine the element of atom '{name}'")]
    UnknownElement { name: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_int(line: &str, line_num: usize, start: usize, end: usize) -> Result<isize, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// Adds a single bond between every pair of atoms closer than the sum of their covalent radii
/// plus a fixed tolerance.
///
/// Returns the number of bonds added.
pub fn perceive_bonds(system: &mut MolecularSystem) -> usize {
    let atoms: Vec<(AtomId, Element, Point3<f64>)> = system
        .atoms_iter()
        .map(|(id, atom)| (id, atom.element, atom.position))
        .collect();

    let mut added = 0;
    for (i, (id_a, element_a, pos_a)) in atoms.iter().enumerate() {
        for (id_b, element_b, pos_b) in &atoms[i + 1..] {
            let cutoff = element_a.covalent_radius() + element_b.covalent_radius() + BOND_TOLERANCE;
            let distance = (pos_a - pos_b).norm();
            if distance > MIN_BOND_DISTANCE
                && distance <= cutoff
                && system.add_bond(*id_a, *id_b, BondOrder::Single).is_some()
            {
                added += 1;
            }
        }
    }
    added
}

/// Reader and writer for the subset of the PDB format used by residue templates.
///
/// Reading understands `ATOM`/`HETATM` and `CONECT`; all other records except header lines are
/// skipped. Writing emits `HETATM` records with serials renumbered in iteration order, followed
/// by full `CONECT` records.
pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut system = MolecularSystem::new();
        let mut metadata = PdbMetadata::default();
        let mut serial_map: HashMap<usize, AtomId> = HashMap::new();
        let mut conect: Vec<(usize, usize, usize)> = Vec::new();
        let mut current_residue: Option<((String, isize, String), ResidueId)> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let serial = parse_int(&line, line_num, 6, 11)? as usize;
                    let name = slice_and_trim(&line, 12, 16);
                    if name.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }
                    let res_name = slice_and_trim(&line, 17, 20);
                    let chain_id = slice_and_trim(&line, 21, 22);
                    let res_seq = parse_int(&line, line_num, 22, 26)?;
                    let x = parse_float(&line, line_num, 30, 38)?;
                    let y = parse_float(&line, line_num, 38, 46)?;
                    let z = parse_float(&line, line_num, 46, 54)?;

                    let element_str = slice_and_trim(&line, 76, 78);
                    let element = if element_str.is_empty() {
                        Element::from_atom_name(name)
                    } else {
                        element_str.parse().ok()
                    }
                    .ok_or_else(|| PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::UnknownElement { name: name.into() },
                    })?;

                    if serial_map.contains_key(&serial) {
                        return Err(PdbError::Inconsistency(format!(
                            "Duplicate atom serial: {}",
                            serial
                        )));
                    }

                    let key = (chain_id.to_string(), res_seq, res_name.to_string());
                    let residue_id = match &current_residue {
                        Some((current_key, id)) if *current_key == key => *id,
                        _ => {
                            let id = system.add_residue(res_seq, res_name);
                            current_residue = Some((key, id));
                            id
                        }
                    };

                    let mut atom = Atom::new(name, element, residue_id, Point3::new(x, y, z));
                    atom.serial = serial;
                    let atom_id = system.add_atom_to_residue(residue_id, atom).ok_or_else(|| {
                        PdbError::Inconsistency(format!("Residue for atom {} vanished", serial))
                    })?;
                    serial_map.insert(serial, atom_id);
                }
                "CONECT" => {
                    let mut parts = line.split_whitespace().skip(1).map(str::parse::<usize>);
                    let Some(Ok(origin)) = parts.next() else {
                        continue;
                    };
                    for partner in parts.flatten() {
                        conect.push((line_num, origin, partner));
                    }
                }
                "HEADER" | "TITLE" | "COMPND" | "REMARK" => metadata.header_lines.push(line),
                "END" | "ENDMDL" => break,
                _ => {}
            }
        }

        if serial_map.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }

        if conect.is_empty() {
            let inferred = perceive_bonds(&mut system);
            metadata.bonds_inferred = true;
            debug!("No CONECT records; perceived {} bonds from distances", inferred);
        } else {
            for (line_num, a, b) in conect {
                let (Some(&id_a), Some(&id_b)) = (serial_map.get(&a), serial_map.get(&b)) else {
                    return Err(PdbError::Inconsistency(format!(
                        "CONECT on line {} references unknown atom serial",
                        line_num
                    )));
                };
                if a != b {
                    system.add_bond(id_a, id_b, BondOrder::Single);
                }
            }
        }

        Ok((system, metadata))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }

        let mut serials: HashMap<AtomId, usize> = HashMap::with_capacity(system.atom_count());
        for (index, (atom_id, atom)) in system.atoms_iter().enumerate() {
            let serial = index + 1;
            serials.insert(atom_id, serial);

            let residue = system.residue(atom.residue_id).ok_or_else(|| {
                PdbError::Inconsistency(format!("Atom '{}' has no residue", atom.name))
            })?;
            let name_field = if atom.name.len() < 4 {
                format!(" {}", atom.name)
            } else {
                atom.name.clone()
            };
            let res_name: String = residue.name.chars().take(3).collect();

            writeln!(
                writer,
                "{:<6}{:>5} {:<4}{:1}{:>3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
                "HETATM",
                serial,
                name_field,
                ' ',
                res_name,
                'A',
                residue.residue_number,
                ' ',
                atom.position.x,
                atom.position.y,
                atom.position.z,
                1.0,
                0.0,
                atom.element.symbol()
            )?;
        }

        let mut bond_map: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for bond in system.bonds() {
            let (Some(&s1), Some(&s2)) = (serials.get(&bond.atom1_id), serials.get(&bond.atom2_id))
            else {
                return Err(PdbError::Inconsistency(
                    "Bond references an atom that is not in the system".into(),
                ));
            };
            bond_map.entry(s1).or_default().push(s2);
            bond_map.entry(s2).or_default().push(s1);
        }
        for (serial, partners) in &mut bond_map {
            partners.sort_unstable();
            // CONECT holds at most four partners per record.
            for chunk in partners.chunks(4) {
                write!(writer, "CONECT{:>5}", serial)?;
                for partner in chunk {
                    write!(writer, "{:>5}", partner)?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    const GLC_TEMPLATE: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/data/db_glycans/GLC.pdb"
    ));

    fn read_str(text: &str) -> Result<(MolecularSystem, PdbMetadata), PdbError> {
        let mut reader = BufReader::new(Cursor::new(text.as_bytes()));
        PdbFile::read_from(&mut reader)
    }

    #[test]
    fn reads_template_and_perceives_ring_connectivity() {
        let (system, metadata) = read_str(GLC_TEMPLATE).unwrap();

        assert_eq!(system.atom_count(), 24);
        assert_eq!(system.residues_iter().count(), 1);
        assert!(metadata.bonds_inferred);
        assert_eq!(system.bonds().len(), 24);

        let c1 = system.find_atom(1, "C1").unwrap();
        let o5 = system.find_atom(1, "O5").unwrap();
        let o1 = system.find_atom(1, "O1").unwrap();
        let h1o = system.find_atom(1, "H1o").unwrap();
        assert!(system.are_bonded(c1, o5));
        assert!(system.are_bonded(c1, o1));
        assert!(system.are_bonded(o1, h1o));
        assert_eq!(system.atom(h1o).unwrap().element, Element::H);
        assert!(system.valence_violations().is_empty());
        assert_eq!(system.fragment_count(), 1);
    }

    #[test]
    fn write_then_read_preserves_atoms_and_bonds_through_conect() {
        let (system, _) = read_str(GLC_TEMPLATE).unwrap();
        let mut buffer = Vec::new();
        let metadata = PdbMetadata {
            header_lines: vec!["REMARK   1 built by glycobuild".into()],
            bonds_inferred: false,
        };
        PdbFile::write_to(&system, &metadata, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("REMARK   1 built by glycobuild\n"));
        assert!(text.contains("HETATM    1  C1  GLC A   1"));
        assert!(text.contains("CONECT"));

        let (reread, reread_meta) = read_str(&text).unwrap();
        assert!(!reread_meta.bonds_inferred);
        assert_eq!(reread_meta.header_lines, metadata.header_lines);
        assert_eq!(reread.atom_count(), 24);
        assert_eq!(reread.bonds().len(), 24);
        let names: Vec<_> = reread.atoms_iter().map(|(_, a)| a.name.clone()).collect();
        let original: Vec<_> = system.atoms_iter().map(|(_, a)| a.name.clone()).collect();
        assert_eq!(names, original);
    }

    #[test]
    fn conect_records_replace_distance_perception() {
        let text = "\
HETATM    1  C1  GLC A   1       0.000   0.000   0.000  1.00  0.00           C
HETATM    2  O1  GLC A   1       1.430   0.000   0.000  1.00  0.00           O
HETATM    3  C2  GLC A   1       5.000   0.000   0.000  1.00  0.00           C
CONECT    1    3
END
";
        let (system, metadata) = read_str(text).unwrap();
        assert!(!metadata.bonds_inferred);
        assert_eq!(system.bonds().len(), 1);
        let c1 = system.find_atom(1, "C1").unwrap();
        let c2 = system.find_atom(1, "C2").unwrap();
        assert!(system.are_bonded(c1, c2));
    }

    #[test]
    fn element_falls_back_to_atom_name() {
        let text = "HETATM    1  O4  GAL A   2       0.000   0.000   0.000\n";
        let (system, _) = read_str(text).unwrap();
        let o4 = system.find_atom(2, "O4").unwrap();
        assert_eq!(system.atom(o4).unwrap().element, Element::O);
    }

    #[test]
    fn residue_changes_start_new_residues() {
        let text = "\
HETATM    1  C1  GLC A   1       0.000   0.000   0.000  1.00  0.00           C
HETATM    2  C1  GAL A   2       9.000   0.000   0.000  1.00  0.00           C
";
        let (system, _) = read_str(text).unwrap();
        assert_eq!(system.residues_iter().count(), 2);
        assert!(system.find_atom(2, "C1").is_some());
    }

    #[test]
    fn invalid_coordinate_reports_columns() {
        let text = "HETATM    1  C1  GLC A   1       abc     0.000   0.000  1.00  0.00           C\n";
        match read_str(text) {
            Err(PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::InvalidFloat { columns, .. },
            }) => assert_eq!(columns, "31-38"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn duplicate_serials_are_inconsistent() {
        let text = "\
HETATM    1  C1  GLC A   1       0.000   0.000   0.000  1.00  0.00           C
HETATM    1  C2  GLC A   1       1.500   0.000   0.000  1.00  0.00           C
";
        assert!(matches!(read_str(text), Err(PdbError::Inconsistency(_))));
    }

    #[test]
    fn file_without_atoms_is_rejected() {
        assert!(matches!(
            read_str("REMARK empty\nEND\n"),
            Err(PdbError::MissingRecord(_))
        ));
    }

    #[test]
    fn path_round_trip_uses_files() {
        let (system, metadata) = read_str(GLC_TEMPLATE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glc.pdb");

        PdbFile::write_to_path(&system, &metadata, &path).unwrap();
        let (reread, _) = PdbFile::read_from_path(&path).unwrap();

        assert_eq!(reread.atom_count(), system.atom_count());
    }
}
