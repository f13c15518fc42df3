//! Reference glycan dataset and its load pipeline.
//!
//! The raw file has five positional columns: numeric id, IUPAC-condensed
//! structure, species list (a stringified list literal), immunogenicity code
//! and link code. [`parse_dataset`] turns it into display-ready
//! [`GlycanRecord`]s:
//!
//! 1. read raw records
//! 2. re-key ids with the `SBID` prefix
//! 3. normalize species text
//! 4. move records of the reference organism to the front (stable)
//! 5. recode immunogenicity and link
//! 6. expose canonical display column names

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{DataKind, DataLoadError};

pub const ID_PREFIX: &str = "SBID";

/// Canonical display column labels, in table order.
pub const DISPLAY_COLUMNS: [&str; 5] = ["Glycan ID", "Glycan", "Species", "Immunogenicity", "Link"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Immunogenicity {
    Yes,
    No,
    Unknown,
}

impl Immunogenicity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Immunogenicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Glycan attachment type. Codes other than empty and `free` are kept
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkType {
    None,
    Free,
    N,
    O,
    Other(String),
}

impl LinkType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Free => "Free",
            Self::N => "N",
            Self::O => "O",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LinkType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One display-ready dataset row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlycanRecord {
    #[serde(rename = "Glycan ID")]
    pub id: String,
    #[serde(rename = "Glycan")]
    pub structure: String,
    #[serde(rename = "Species")]
    pub species: Vec<String>,
    #[serde(rename = "Immunogenicity")]
    pub immunogenicity: Immunogenicity,
    #[serde(rename = "Link")]
    pub link: LinkType,
}

impl GlycanRecord {
    pub fn mentions(&self, organism: &str) -> bool {
        self.species.iter().any(|s| s == organism)
    }
}

/// The immutable reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub reference_organism: String,
    pub records: Vec<GlycanRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GlycanRecord> {
        self.records.iter()
    }

    /// Number of leading records that mention the reference organism.
    pub fn reference_count(&self) -> usize {
        self.records
            .iter()
            .take_while(|r| r.mentions(&self.reference_organism))
            .count()
    }
}

// ── Pipeline steps ──────────────────────────────────────────────────────

pub fn rekey_id(raw: &str) -> String {
    format!("{ID_PREFIX}{}", raw.trim())
}

/// `"['Homo_sapiens', 'Mus_musculus']"` → `["Homo sapiens", "Mus musculus"]`.
pub fn normalize_species(raw: &str) -> Vec<String> {
    raw.chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"'))
        .map(|c| if c == '_' { ' ' } else { c })
        .collect::<String>()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `0` → No, `1` → Yes, anything else (including absent) → Unknown.
pub fn recode_immunogenic(raw: Option<&str>) -> Immunogenicity {
    match raw.map(str::trim).and_then(|v| v.parse::<f64>().ok()) {
        Some(v) if v == 0.0 => Immunogenicity::No,
        Some(v) if v == 1.0 => Immunogenicity::Yes,
        _ => Immunogenicity::Unknown,
    }
}

pub fn recode_link(raw: Option<&str>) -> LinkType {
    match raw.map(str::trim).unwrap_or_default() {
        "" => LinkType::None,
        "free" => LinkType::Free,
        "N" => LinkType::N,
        "O" => LinkType::O,
        code => LinkType::Other(code.to_string()),
    }
}

/// Stable partition: items matching `is_reference` first, then the rest, each
/// group in input order.
pub fn partition_reference_first<T>(items: Vec<T>, is_reference: impl Fn(&T) -> bool) -> Vec<T> {
    let (mut front, back): (Vec<T>, Vec<T>) = items.into_iter().partition(|item| is_reference(item));
    front.extend(back);
    front
}

/// Run the full dataset pipeline over raw CSV bytes.
///
/// # Errors
///
/// Fails on malformed CSV or a row without id or structure.
pub fn parse_dataset(bytes: &[u8], reference_organism: &str) -> Result<Dataset, DataLoadError> {
    let err = |cause: String| DataLoadError::new(DataKind::Dataset, cause);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| err(e.to_string()))?;
        let field = |col: usize| row.get(col).filter(|v| !v.is_empty());

        let (Some(id), Some(structure)) = (field(0), field(1)) else {
            return Err(err(format!("row {} lacks id or structure", index + 1)));
        };
        records.push(GlycanRecord {
            id: rekey_id(id),
            structure: structure.to_string(),
            species: field(2).map(normalize_species).unwrap_or_default(),
            immunogenicity: recode_immunogenic(field(3)),
            link: recode_link(field(4)),
        });
    }

    let records = partition_reference_first(records, |r| r.mentions(reference_organism));
    Ok(Dataset {
        reference_organism: reference_organism.to_string(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HUMAN: &str = "Homo sapiens";

    #[test]
    fn test_partition_keeps_relative_order() {
        let input = vec![("A", false), ("B", true), ("C", true), ("D", false)];
        let output: Vec<&str> = partition_reference_first(input, |(_, human)| *human)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(output, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_immunogenicity_recoding() {
        assert_eq!(recode_immunogenic(Some("0")), Immunogenicity::No);
        assert_eq!(recode_immunogenic(Some("1")), Immunogenicity::Yes);
        assert_eq!(recode_immunogenic(Some("1.0")), Immunogenicity::Yes);
        assert_eq!(recode_immunogenic(None), Immunogenicity::Unknown);
        assert_eq!(recode_immunogenic(Some("")), Immunogenicity::Unknown);
        assert_eq!(recode_immunogenic(Some("2")), Immunogenicity::Unknown);
    }

    #[test]
    fn test_link_recoding() {
        assert_eq!(recode_link(Some("")), LinkType::None);
        assert_eq!(recode_link(None), LinkType::None);
        assert_eq!(recode_link(Some("free")), LinkType::Free);
        assert_eq!(recode_link(Some("N")), LinkType::N);
        assert_eq!(recode_link(Some("O")), LinkType::O);
        assert_eq!(recode_link(Some("C")).as_str(), "C");
        assert_eq!(recode_link(Some("FREE")), LinkType::Other("FREE".into()));
        assert_eq!(LinkType::None.to_string(), "None");
        assert_eq!(LinkType::Free.to_string(), "Free");
    }

    #[test]
    fn test_species_normalization() {
        assert_eq!(
            normalize_species("['Homo_sapiens', 'Mus_musculus']"),
            vec!["Homo sapiens", "Mus musculus"]
        );
        assert_eq!(normalize_species("[]"), Vec::<String>::new());
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let csv = "\
id,glycan,species,immunogenicity,link
1,Man(a1-3)Man,['Escherichia_coli'],1,free
2,Gal(b1-4)Glc,['Homo_sapiens'],0,
3,Fuc(a1-2)Gal,\"['Homo_sapiens', 'Pan_troglodytes']\",,N
4,Glc,['Bos_taurus'],,O
";
        let dataset = parse_dataset(csv.as_bytes(), HUMAN).unwrap();
        let ids: Vec<&str> = dataset.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["SBID2", "SBID3", "SBID1", "SBID4"]);
        assert_eq!(dataset.reference_count(), 2);

        let first = &dataset.records[0];
        assert_eq!(first.species, vec!["Homo sapiens"]);
        assert_eq!(first.immunogenicity, Immunogenicity::No);
        assert_eq!(first.link, LinkType::None);
        assert_eq!(dataset.records[1].immunogenicity, Immunogenicity::Unknown);
        assert_eq!(dataset.records[2].link, LinkType::Free);
    }

    #[test]
    fn test_display_columns_in_json() {
        let record = GlycanRecord {
            id: "SBID1".into(),
            structure: "Man".into(),
            species: vec![HUMAN.into()],
            immunogenicity: Immunogenicity::Yes,
            link: LinkType::Free,
        };
        let json = serde_json::to_value(&record).unwrap();
        for column in DISPLAY_COLUMNS {
            assert!(json.get(column).is_some(), "missing column {column}");
        }
        assert_eq!(json["Link"], "Free");
        assert_eq!(json["Immunogenicity"], "Yes");
    }

    #[test]
    fn test_row_without_structure_is_error() {
        let csv = "id,glycan\n1,\n";
        let err = parse_dataset(csv.as_bytes(), HUMAN).unwrap_err();
        assert_eq!(err.kind, DataKind::Dataset);
    }
}
