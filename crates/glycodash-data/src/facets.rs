//! Facet tables: the distinct filterable values behind every selection input.
//!
//! Built once from the dataset and the taxonomy table, then shared read-only.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{DataKind, DataLoadError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Monosaccharide,
    Bond,
    Species,
    Kingdom,
}

impl Facet {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monosaccharide => "monosaccharide",
            Self::Bond => "bond",
            Self::Species => "species",
            Self::Kingdom => "kingdom",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monosaccharide" | "monosaccharides" | "sugar" => Ok(Self::Monosaccharide),
            "bond" | "bonds" => Ok(Self::Bond),
            "species" => Ok(Self::Species),
            "kingdom" | "kingdoms" => Ok(Self::Kingdom),
            other => Err(format!("unknown facet '{other}'")),
        }
    }
}

/// Monosaccharides and bonds found in one structure label, in order of
/// appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureTokens {
    pub monosaccharides: Vec<String>,
    pub bonds: Vec<String>,
}

/// Split an IUPAC-condensed label into glycoletters. Text inside parentheses
/// is a bond; runs between `(`, `)`, `[` and `]` are monosaccharides.
///
/// `Fuc(a1-2)[Gal(b1-3)]GalNAc` → monosaccharides `Fuc, Gal, GalNAc`, bonds
/// `a1-2, b1-3`.
pub fn tokenize_structure(label: &str) -> StructureTokens {
    let mut tokens = StructureTokens::default();
    let mut current = String::new();
    let mut in_bond = false;

    let mut flush = |buf: &mut String, bond: bool| {
        let token = buf.trim();
        if !token.is_empty() {
            if bond {
                tokens.bonds.push(token.to_string());
            } else {
                tokens.monosaccharides.push(token.to_string());
            }
        }
        buf.clear();
    };

    for c in label.chars() {
        match c {
            '(' => {
                flush(&mut current, false);
                in_bond = true;
            }
            ')' => {
                flush(&mut current, true);
                in_bond = false;
            }
            '[' | ']' => flush(&mut current, in_bond),
            _ => current.push(c),
        }
    }
    flush(&mut current, in_bond);
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxonomyRow {
    pub species: String,
    pub kingdom: String,
}

/// Parse the `species,kingdom` taxonomy table.
pub fn parse_taxonomy(bytes: &[u8]) -> Result<Vec<TaxonomyRow>, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    reader
        .deserialize::<TaxonomyRow>()
        .map(|row| {
            row.map(|r| TaxonomyRow {
                species: r.species.replace('_', " "),
                kingdom: r.kingdom,
            })
            .map_err(|e| DataLoadError::new(DataKind::Taxonomy, e))
        })
        .collect()
}

/// Sorted, deduplicated facet values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetTables {
    monosaccharides: Arc<[String]>,
    bonds: Arc<[String]>,
    species: Arc<[String]>,
    kingdoms: Arc<[String]>,
}

impl FacetTables {
    pub fn build(dataset: &Dataset, taxonomy: &[TaxonomyRow]) -> Self {
        let mut monosaccharides = BTreeSet::new();
        let mut bonds = BTreeSet::new();
        let mut species = BTreeSet::new();

        for record in dataset.iter() {
            let tokens = tokenize_structure(&record.structure);
            monosaccharides.extend(tokens.monosaccharides);
            bonds.extend(tokens.bonds);
            species.extend(record.species.iter().cloned());
        }
        let kingdoms: BTreeSet<String> = taxonomy
            .iter()
            .map(|row| row.kingdom.clone())
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            monosaccharides: monosaccharides.into_iter().collect(),
            bonds: bonds.into_iter().collect(),
            species: species.into_iter().collect(),
            kingdoms: kingdoms.into_iter().collect(),
        }
    }

    /// Shared handle to one facet's values.
    pub fn values(&self, facet: Facet) -> Arc<[String]> {
        match facet {
            Facet::Monosaccharide => Arc::clone(&self.monosaccharides),
            Facet::Bond => Arc::clone(&self.bonds),
            Facet::Species => Arc::clone(&self.species),
            Facet::Kingdom => Arc::clone(&self.kingdoms),
        }
    }

    pub fn contains(&self, facet: Facet, value: &str) -> bool {
        let values = match facet {
            Facet::Monosaccharide => &self.monosaccharides,
            Facet::Bond => &self.bonds,
            Facet::Species => &self.species,
            Facet::Kingdom => &self.kingdoms,
        };
        values.binary_search_by(|v| v.as_str().cmp(value)).is_ok()
    }
}
