//! Reader for the connectivity table that describes an oligosaccharide.
//!
//! Each line names one glycosidic bond with six whitespace-separated fields:
//!
//! ```text
//! # i  name_i  j  name_j  atom_i  atom_j
//!   0  GLC     1  GLC     1       4
//!   1  GLC     2  GAL     1       4
//! ```
//!
//! Blank lines and lines starting with `#` are skipped, and fields after the sixth are ignored.
//! The residue list is built from the same lines: every row assigns `residues[i] = name_i` and
//! then `residues[j] = name_j`, so a later row silently overrides an earlier name for the same
//! index.

use crate::core::models::linkage::{BondRecord, ResidueList};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const FIELDS_PER_RECORD: usize = 6;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Line {line}: expected 6 fields, found {found}")]
    TooFewFields { line: usize, found: usize },
    #[error("Line {line}: field {column} is not an integer (value: '{value}')")]
    InvalidInteger {
        line: usize,
        column: usize,
        value: String,
    },
    #[error("Line {line}: residue index {index} is outside 0..={max}")]
    ResidueIndexOutOfRange { line: usize, index: i64, max: usize },
    #[error("Residue index {index} is never assigned a name")]
    GapInResidueIndex { index: usize },
    #[error("Connectivity table contains no bond records")]
    EmptyInput,
}

struct RawRecord<'a> {
    line: usize,
    index_i: i64,
    name_i: &'a str,
    index_j: i64,
    name_j: &'a str,
    atom_i: u32,
    atom_j: u32,
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    line: usize,
    column: usize,
) -> Result<T, ParseError> {
    let value = fields[column - 1];
    value.parse().map_err(|_| ParseError::InvalidInteger {
        line,
        column,
        value: value.to_string(),
    })
}

fn parse_line(line: usize, text: &str) -> Result<Option<RawRecord<'_>>, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() < FIELDS_PER_RECORD {
        return Err(ParseError::TooFewFields {
            line,
            found: fields.len(),
        });
    }

    Ok(Some(RawRecord {
        line,
        index_i: parse_field(&fields, line, 1)?,
        name_i: fields[1],
        index_j: parse_field(&fields, line, 3)?,
        name_j: fields[3],
        atom_i: parse_field(&fields, line, 5)?,
        atom_j: parse_field(&fields, line, 6)?,
    }))
}

fn checked_index(line: usize, index: i64, max: usize) -> Result<usize, ParseError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i <= max)
        .ok_or(ParseError::ResidueIndexOutOfRange { line, index, max })
}

/// Parses a connectivity table from any buffered reader.
///
/// # Errors
///
/// Returns a [`ParseError`] for unreadable input, malformed lines, residue indices outside
/// `0..=N` (with `N` the number of bond records), indices that never receive a name, or a
/// table without any bond record.
pub fn parse_connectivity(
    reader: impl BufRead,
) -> Result<(ResidueList, Vec<BondRecord>), ParseError> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;

    let mut raw_records = Vec::new();
    for (number, text) in lines.iter().enumerate() {
        if let Some(record) = parse_line(number + 1, text)? {
            raw_records.push(record);
        }
    }

    if raw_records.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let max_index = raw_records.len();
    let mut names: Vec<Option<String>> = vec![None; max_index + 1];
    let mut bonds = Vec::with_capacity(raw_records.len());

    for raw in &raw_records {
        let i = checked_index(raw.line, raw.index_i, max_index)?;
        let j = checked_index(raw.line, raw.index_j, max_index)?;
        names[i] = Some(raw.name_i.to_string());
        names[j] = Some(raw.name_j.to_string());
        bonds.push(BondRecord::new(
            i,
            raw.name_i,
            j,
            raw.name_j,
            raw.atom_i,
            raw.atom_j,
        ));
    }

    let residues = names
        .into_iter()
        .enumerate()
        .map(|(index, name)| name.ok_or(ParseError::GapInResidueIndex { index }))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "Parsed {} bond records over {} residues",
        bonds.len(),
        residues.len()
    );
    Ok((ResidueList::new(residues), bonds))
}

/// Parses a connectivity table held in memory.
pub fn parse_connectivity_str(text: &str) -> Result<(ResidueList, Vec<BondRecord>), ParseError> {
    parse_connectivity(Cursor::new(text.as_bytes()))
}

/// Reads and parses the connectivity table at `path`.
pub fn read_input<P: AsRef<Path>>(path: P) -> Result<(ResidueList, Vec<BondRecord>), ParseError> {
    let file = File::open(path)?;
    parse_connectivity(BufReader::new(file))
}
