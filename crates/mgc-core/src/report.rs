//! Replacement report model
//!
//! A [`Report`] is what a cleaning run produces: one [`ObfuscatorReport`] per
//! configured obfuscator (in configuration order) and the sorted list of
//! omitted relative paths. It is also what a later run can be seeded from.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use crate::{Error, Result};

/// One canonical secret and the value it was replaced with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub canonical: String,
    pub replaced_with: String,
    /// Original substring → number of times it was replaced.
    #[serde(with = "occurrence_list")]
    pub occurrences: BTreeMap<String, u64>,
}

impl Replacement {
    pub fn new(canonical: impl Into<String>, replaced_with: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            replaced_with: replaced_with.into(),
            occurrences: BTreeMap::new(),
        }
    }

    pub fn with_occurrence(mut self, original: impl Into<String>, count: u64) -> Self {
        self.record(original, count);
        self
    }

    pub fn record(&mut self, original: impl Into<String>, count: u64) {
        *self.occurrences.entry(original.into()).or_insert(0) += count;
    }

    pub fn total_occurrences(&self) -> u64 {
        self.occurrences.values().sum()
    }
}

/// Serialized shape of a single occurrence counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub original: String,
    pub count: u64,
}

mod occurrence_list {
    use super::*;

    #[derive(Serialize)]
    struct OccurrenceRef<'a> {
        original: &'a str,
        count: u64,
    }

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<String, u64>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(map.iter().map(|(original, count)| OccurrenceRef {
            original,
            count: *count,
        }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BTreeMap<String, u64>, D::Error> {
        let list = Vec::<Occurrence>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for item in list {
            *map.entry(item.original).or_insert(0) += item.count;
        }
        Ok(map)
    }
}

/// Replacements recorded by a single obfuscator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementReport {
    pub replacements: Vec<Replacement>,
}

impl ReplacementReport {
    pub fn new(replacements: Vec<Replacement>) -> Self {
        Self { replacements }
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Sort by canonical key so concurrent runs produce identical output.
    pub fn sort(&mut self) {
        self.replacements
            .sort_by(|a, b| a.canonical.cmp(&b.canonical));
    }

    /// Flat canonical → replacement view for external consumers.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.replacements
            .iter()
            .map(|r| (r.canonical.clone(), r.replaced_with.clone()))
            .collect()
    }

    pub fn get(&self, canonical: &str) -> Option<&Replacement> {
        self.replacements.iter().find(|r| r.canonical == canonical)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObfuscatorReport {
    pub kind: String,
    pub replacements: ReplacementReport,
}

/// Final output of a cleaning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    #[serde(with = "time::serde::timestamp")]
    pub generated_at: OffsetDateTime,
    pub replacements: Vec<ObfuscatorReport>,
    pub omissions: Vec<String>,
}

impl Report {
    /// Build a report; replacement tables and omissions are sorted here.
    pub fn new(mut replacements: Vec<ObfuscatorReport>, mut omissions: Vec<String>) -> Self {
        for report in &mut replacements {
            report.replacements.sort();
        }
        omissions.sort();
        omissions.dedup();

        Self {
            generated_at: OffsetDateTime::now_utc(),
            replacements,
            omissions,
        }
    }

    /// All canonical → replacement pairs across every obfuscator.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.replacements
            .iter()
            .flat_map(|r| r.replacements.to_map())
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| Error::file(path, e))
    }
}
