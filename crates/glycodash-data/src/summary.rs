use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::dataset::Dataset;

/// How many species the summary lists.
pub const TOP_SPECIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesCount {
    pub species: String,
    pub count: usize,
}

/// Headline counts over the reference dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub records: usize,
    pub reference_organism: String,
    pub reference_records: usize,
    pub by_immunogenicity: BTreeMap<String, usize>,
    pub by_link: BTreeMap<String, usize>,
    pub top_species: Vec<SpeciesCount>,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset, top_n: usize) -> Self {
        let mut by_immunogenicity = BTreeMap::new();
        let mut by_link = BTreeMap::new();
        let mut species: HashMap<&str, usize> = HashMap::new();

        for record in dataset.iter() {
            *by_immunogenicity
                .entry(record.immunogenicity.to_string())
                .or_insert(0) += 1;
            *by_link.entry(record.link.to_string()).or_insert(0) += 1;
            for name in &record.species {
                *species.entry(name.as_str()).or_insert(0) += 1;
            }
        }

        let mut top_species: Vec<SpeciesCount> = species
            .into_iter()
            .map(|(species, count)| SpeciesCount {
                species: species.to_string(),
                count,
            })
            .collect();
        top_species.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.species.cmp(&b.species)));
        top_species.truncate(top_n);

        Self {
            records: dataset.len(),
            reference_organism: dataset.reference_organism.clone(),
            reference_records: dataset.reference_count(),
            by_immunogenicity,
            by_link,
            top_species,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::parse_dataset;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary_counts() {
        let csv = "\
id,glycan,species,immunogenicity,link
1,Man,['Homo_sapiens'],1,N
2,Gal,\"['Homo_sapiens', 'Mus_musculus']\",0,N
3,Glc,['Mus_musculus'],,free
4,Fuc,['Bos_taurus'],1,
";
        let dataset = parse_dataset(csv.as_bytes(), "Homo sapiens").unwrap();
        let summary = DatasetSummary::from_dataset(&dataset, 2);

        assert_eq!(summary.records, 4);
        assert_eq!(summary.reference_records, 2);
        assert_eq!(summary.by_immunogenicity["Yes"], 2);
        assert_eq!(summary.by_immunogenicity["No"], 1);
        assert_eq!(summary.by_immunogenicity["Unknown"], 1);
        assert_eq!(summary.by_link["N"], 2);
        assert_eq!(summary.by_link["Free"], 1);
        assert_eq!(summary.by_link["None"], 1);
        assert_eq!(
            summary.top_species,
            vec![
                SpeciesCount { species: "Homo sapiens".into(), count: 2 },
                SpeciesCount { species: "Mus musculus".into(), count: 2 },
            ]
        );
    }
}
