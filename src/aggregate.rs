//! Count aggregation over classified files.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::codes::{ClassificationIndex, CodeTable};
use crate::models::{AcademicYear, ClassifiedFile};

/// Key that marks a placeholder bucket rather than real data.
const PLACEHOLDER_KEY: &str = "0";

type CodeCounts = BTreeMap<String, u64>;
type YearCounts = BTreeMap<String, CodeCounts>;

/// Counts keyed by category, then academic year label, then code.
///
/// Iteration and serialization order: categories descending, years
/// descending (most recent first), codes ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateCounts {
    categories: BTreeMap<String, YearCounts>,
}

impl AggregateCounts {
    /// Categories in output order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().rev().map(String::as_str)
    }

    /// Year labels of a category in output order.
    pub fn years(&self, category: &str) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|years| years.keys().rev().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Code counts for one category and year, codes ascending.
    pub fn codes(&self, category: &str, year: &str) -> Vec<(&str, u64)> {
        self.categories
            .get(category)
            .and_then(|years| years.get(year))
            .map(|codes| codes.iter().map(|(c, n)| (c.as_str(), *n)).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, category: &str, year: &str, code: &str) -> u64 {
        self.categories
            .get(category)
            .and_then(|years| years.get(year))
            .and_then(|codes| codes.get(code))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.categories
            .values()
            .flat_map(|years| years.values())
            .flat_map(|codes| codes.values())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Iterate (year, code, count) for every category.
    fn year_code_counts(&self) -> impl Iterator<Item = (&str, &str, u64)> {
        self.categories.values().flat_map(|years| {
            years.iter().flat_map(|(year, codes)| {
                codes
                    .iter()
                    .map(move |(code, n)| (year.as_str(), code.as_str(), *n))
            })
        })
    }
}

struct YearsDescending<'a>(&'a YearCounts);

impl Serialize for YearsDescending<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (year, codes) in self.0.iter().rev() {
            map.serialize_entry(year, codes)?;
        }
        map.end()
    }
}

impl Serialize for AggregateCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (category, years) in self.categories.iter().rev() {
            map.serialize_entry(category, &YearsDescending(years))?;
        }
        map.end()
    }
}

/// A file that could not be classified, with the folder it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExemptEntry {
    pub file_name: String,
    pub folder_name: String,
}

/// Incrementally folds (category, year, code) triples into counts.
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: BTreeMap<String, YearCounts>,
    exempt: Vec<ExemptEntry>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an empty bucket for each category so that categories
    /// without any documents still appear in the output.
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut aggregator = Self::new();
        for category in categories {
            aggregator.counts.entry(category.into()).or_default();
        }
        aggregator
    }

    pub fn add(&mut self, category: &str, year: &str, code: &str) {
        *self
            .counts
            .entry(category.to_string())
            .or_default()
            .entry(year.to_string())
            .or_default()
            .entry(code.to_string())
            .or_insert(0) += 1;
    }

    /// Add a classified file, looking its category up in the code table.
    /// Returns false when the code is no longer in the table.
    pub fn add_file(&mut self, file: &ClassifiedFile, codes: &CodeTable) -> bool {
        match codes.get(&file.code) {
            Some(entry) => {
                self.add(&entry.category, &file.year.label(), &file.code);
                true
            }
            None => {
                warn!(
                    "Code {} of file {} is no longer in the code table",
                    file.code, file.name
                );
                false
            }
        }
    }

    pub fn add_exempt(&mut self, file_name: impl Into<String>, folder_name: impl Into<String>) {
        self.exempt.push(ExemptEntry {
            file_name: file_name.into(),
            folder_name: folder_name.into(),
        });
    }

    /// Drop placeholder buckets and return the final counts and exempt list.
    pub fn finish(mut self) -> (AggregateCounts, Vec<ExemptEntry>) {
        self.counts.remove(PLACEHOLDER_KEY);
        for years in self.counts.values_mut() {
            years.remove(PLACEHOLDER_KEY);
            for codes in years.values_mut() {
                codes.remove(PLACEHOLDER_KEY);
            }
        }
        (
            AggregateCounts {
                categories: self.counts,
            },
            self.exempt,
        )
    }
}

/// Aggregate classified files by category, year and code.
pub fn aggregate<'a, I>(files: I, codes: &CodeTable) -> AggregateCounts
where
    I: IntoIterator<Item = &'a ClassifiedFile>,
{
    let mut aggregator = Aggregator::new();
    for file in files {
        aggregator.add_file(file, codes);
    }
    aggregator.finish().0
}

/// One line of the NAAC rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NaacRow {
    pub category: String,
    pub classification: String,
    pub count: u64,
}

/// Re-key one academic year's counts by classification number.
///
/// A code associated with several classifications contributes its full count
/// to each of them.
pub fn naac_counts(
    counts: &AggregateCounts,
    codes: &CodeTable,
    year: AcademicYear,
) -> BTreeMap<String, u64> {
    let label = year.label();
    let mut by_classification: BTreeMap<String, u64> = BTreeMap::new();

    for (file_year, code, n) in counts.year_code_counts() {
        if file_year != label {
            continue;
        }
        let Some(entry) = codes.get(code) else {
            continue;
        };
        for classification in &entry.classifications {
            *by_classification.entry(classification.clone()).or_insert(0) += n;
        }
    }

    by_classification
}

/// NAAC rollup for every classification in the index, zero when absent.
pub fn naac_rollup(
    counts: &AggregateCounts,
    codes: &CodeTable,
    index: &ClassificationIndex,
    year: AcademicYear,
) -> Vec<NaacRow> {
    let by_classification = naac_counts(counts, codes, year);
    index
        .iter()
        .map(|(classification, category)| NaacRow {
            category: category.to_string(),
            classification: classification.to_string(),
            count: by_classification.get(classification).copied().unwrap_or(0),
        })
        .collect()
}
