//! Filter selections, rebuilt from raw user input on every change.
//!
//! Parsing ([`FilterSelection::from_raw`]) checks the closed vocabularies;
//! validation against facet tables ([`FilterSelection::validate`]) checks that
//! free-text values name something in the dataset.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use glycodash_data::{Facet, FacetTables};

use crate::error::QueryError;

/// Taxonomy value meaning "no restriction".
pub const ALL: &str = "All";

// ── Criteria ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criteria {
    /// Target is a bond; count the monosaccharides making it.
    Bond,
    /// Target is a monosaccharide; count the monosaccharides paired with it.
    PairedMonosaccharide,
    /// Target is a monosaccharide; count the bonds it makes.
    Combined,
}

impl Criteria {
    /// Mode name understood by the context analysis service.
    pub fn service_mode(self) -> &'static str {
        match self {
            Self::Bond => "bond",
            Self::PairedMonosaccharide => "sugar",
            Self::Combined => "sugarbond",
        }
    }

    /// Facet the target label must belong to.
    pub fn target_facet(self) -> Facet {
        match self {
            Self::Bond => Facet::Bond,
            Self::PairedMonosaccharide | Self::Combined => Facet::Monosaccharide,
        }
    }

    pub(crate) fn describe(self, target: &str) -> String {
        match self {
            Self::Bond => format!("Observed monosaccharides making bond {target}"),
            Self::PairedMonosaccharide => format!("Observed monosaccharides paired with {target}"),
            Self::Combined => format!("Observed bonds made by {target}"),
        }
    }
}

impl FromStr for Criteria {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bond" => Ok(Self::Bond),
            "paired-monosaccharide" => Ok(Self::PairedMonosaccharide),
            "combined" => Ok(Self::Combined),
            _ => Err(QueryError::InvalidCriteria(s.to_string())),
        }
    }
}

// ── Taxonomy ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaxonomyLevel {
    Kingdom,
    Species,
}

impl TaxonomyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kingdom => "Kingdom",
            Self::Species => "Species",
        }
    }

    pub fn facet(self) -> Facet {
        match self {
            Self::Kingdom => Facet::Kingdom,
            Self::Species => Facet::Species,
        }
    }
}

impl fmt::Display for TaxonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyLevel {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kingdom" => Ok(Self::Kingdom),
            "species" => Ok(Self::Species),
            _ => Err(QueryError::InvalidTaxonomyLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaxonomyFilter {
    All,
    Value(String),
}

impl TaxonomyFilter {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == ALL {
            Self::All
        } else {
            Self::Value(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL,
            Self::Value(v) => v,
        }
    }
}

impl Serialize for TaxonomyFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Taxonomic restriction shared by every context query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TaxonomyScope {
    pub level: TaxonomyLevel,
    pub filter: TaxonomyFilter,
}

impl TaxonomyScope {
    pub fn from_raw(level: &str, value: &str) -> Result<Self, QueryError> {
        Ok(Self {
            level: level.parse()?,
            filter: TaxonomyFilter::parse(value),
        })
    }

    pub fn validate(&self, facets: &FacetTables) -> Result<(), QueryError> {
        match &self.filter {
            TaxonomyFilter::All => Ok(()),
            TaxonomyFilter::Value(value) if facets.contains(self.level.facet(), value) => Ok(()),
            TaxonomyFilter::Value(value) => Err(QueryError::InvalidTaxonomyValue {
                level: self.level.to_string(),
                value: value.clone(),
            }),
        }
    }
}

impl fmt::Display for TaxonomyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.level, self.filter.as_str())
    }
}

// ── Selections ──────────────────────────────────────────────────────────

/// Input of the context chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterSelection {
    pub criteria: Criteria,
    pub target: String,
    pub scope: TaxonomyScope,
}

impl FilterSelection {
    pub fn from_raw(criteria: &str, target: &str, level: &str, value: &str) -> Result<Self, QueryError> {
        Ok(Self {
            criteria: criteria.parse()?,
            target: target.trim().to_string(),
            scope: TaxonomyScope::from_raw(level, value)?,
        })
    }

    pub fn validate(&self, facets: &FacetTables) -> Result<(), QueryError> {
        let facet = self.criteria.target_facet();
        if !facets.contains(facet, &self.target) {
            return Err(QueryError::InvalidTarget {
                facet: facet.to_string(),
                target: self.target.clone(),
            });
        }
        self.scope.validate(facets)
    }

    /// `Observed monosaccharides making bond b1-4 (Kingdom = All)`.
    pub fn title(&self) -> String {
        format!("{} ({})", self.criteria.describe(&self.target), self.scope)
    }
}

/// Input of the main-versus-side-branch chart. The target may be any
/// glycoletter: a monosaccharide or a bond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BranchSelection {
    pub target: String,
    pub scope: TaxonomyScope,
}

impl BranchSelection {
    pub fn from_raw(target: &str, level: &str, value: &str) -> Result<Self, QueryError> {
        Ok(Self {
            target: target.trim().to_string(),
            scope: TaxonomyScope::from_raw(level, value)?,
        })
    }

    pub fn validate(&self, facets: &FacetTables) -> Result<(), QueryError> {
        if !facets.contains(Facet::Monosaccharide, &self.target)
            && !facets.contains(Facet::Bond, &self.target)
        {
            return Err(QueryError::InvalidTarget {
                facet: "glycoletter".into(),
                target: self.target.clone(),
            });
        }
        self.scope.validate(facets)
    }
}
