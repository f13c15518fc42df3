//! Two-dimensional embedding tables (tSNE coordinates) for glycans,
//! glycowords and glycoletters.
//!
//! Source files carry two or three columns in no fixed order. The label column
//! is the one that is not entirely numeric; a file with only two numeric
//! columns gets its row numbers as labels. Output rows are always
//! `(label, dim1, dim2)`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{DataKind, DataLoadError};

/// Item level of a projection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Whole glycan structures.
    Structure,
    /// Glycowords (trisaccharide fragments).
    Word,
    /// Glycoletters (single monosaccharides or bonds).
    Letter,
}

impl ProjectionKind {
    pub const ALL: [ProjectionKind; 3] = [Self::Structure, Self::Word, Self::Letter];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Word => "word",
            Self::Letter => "letter",
        }
    }

    /// Word and letter labels arrive as stringified lists and need their
    /// punctuation stripped.
    fn cleans_labels(self) -> bool {
        matches!(self, Self::Word | Self::Letter)
    }
}

impl fmt::Display for ProjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structure" | "glycan" | "glycans" => Ok(Self::Structure),
            "word" | "glycoword" | "glycowords" => Ok(Self::Word),
            "letter" | "glycoletter" | "glycoletters" => Ok(Self::Letter),
            other => Err(format!("unknown projection kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionPoint {
    pub label: String,
    pub dim1: f64,
    pub dim2: f64,
}

/// A loaded projection table. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionTable {
    pub kind: ProjectionKind,
    pub points: Vec<ProjectionPoint>,
}

impl ProjectionTable {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Strip list-literal punctuation from a word or letter label.
pub fn clean_label(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"' | ','))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Parse one projection file.
///
/// # Errors
///
/// Fails when the file is not CSV, has other than two or three columns, or
/// a coordinate does not parse as a number.
pub fn parse_projection(kind: ProjectionKind, bytes: &[u8]) -> Result<ProjectionTable, DataLoadError> {
    let err = |cause: String| DataLoadError::new(DataKind::Projection(kind), cause);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let rows: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .map_err(|e| err(e.to_string()))?;

    let width = reader.headers().map_err(|e| err(e.to_string()))?.len();
    let (label_col, dim_cols) = match width {
        2 => (None, [0, 1]),
        3 => {
            let label = (0..3)
                .find(|&col| !rows.iter().all(|row| is_numeric(row.get(col))))
                .unwrap_or(0);
            let dims: Vec<usize> = (0..3).filter(|&col| col != label).collect();
            (Some(label), [dims[0], dims[1]])
        }
        n => return Err(err(format!("expected 2 or 3 columns, found {n}"))),
    };

    let mut points = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let raw_label = match label_col {
            Some(col) => row.get(col).unwrap_or_default().to_string(),
            None => index.to_string(),
        };
        let label = if kind.cleans_labels() {
            clean_label(&raw_label)
        } else {
            raw_label
        };
        if kind == ProjectionKind::Letter && label.is_empty() {
            continue;
        }

        let coord = |col: usize| -> Result<f64, DataLoadError> {
            let value = row.get(col).unwrap_or_default();
            value
                .parse::<f64>()
                .map_err(|_| err(format!("row {}: '{value}' is not a number", index + 1)))
        };
        points.push(ProjectionPoint {
            label,
            dim1: coord(dim_cols[0])?,
            dim2: coord(dim_cols[1])?,
        });
    }

    Ok(ProjectionTable { kind, points })
}

fn is_numeric(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.parse::<f64>().is_ok())
}
