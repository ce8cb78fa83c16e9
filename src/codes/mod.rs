//! Accreditation code list extracted from the classification workbook.
//!
//! The governing sheet lists, from row 3 on, a category (column A), a
//! classification number (B), a code (C) and its full name (D). Merged cells
//! show up as blanks, so category and classification carry forward from the
//! last non-blank value. Every other sheet contributes (code, name) pairs in
//! columns B and C for codes the governing sheet does not mention.

pub mod xlsx;

use std::collections::BTreeMap;
use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::export::write_json_atomic;
pub use xlsx::{Row, Sheet, Workbook};

/// Title of the governing sheet in the classification workbook.
pub const DEFAULT_PRIMARY_SHEET: &str = "NAAC Quantitative";

/// First data row of the governing sheet (rows 1-2 are headers).
const PRIMARY_FIRST_ROW: u32 = 3;

/// Classification recorded for codes found only on secondary sheets.
pub const UNKNOWN_CLASSIFICATION: &str = "Unknown";

/// Full name, category and classification numbers of one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub name: String,
    pub category: String,
    pub classifications: Vec<String>,
}

/// Lookup from short code to its entry.
pub type CodeTable = BTreeMap<String, CodeEntry>;

/// Classification numbers and their category, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationIndex {
    entries: Vec<(String, String)>,
}

impl ClassificationIndex {
    /// Register a classification unless it is already known.
    pub fn insert_if_absent(&mut self, classification: &str, category: &str) {
        if self.category(classification).is_none() {
            self.entries
                .push((classification.to_string(), category.to_string()));
        }
    }

    pub fn category(&self, classification: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == classification)
            .map(|(_, category)| category.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, cat)| (c.as_str(), cat.as_str()))
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (_, category) in &self.entries {
            if !seen.contains(&category.as_str()) {
                seen.push(category);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ClassificationIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (classification, category) in &self.entries {
            map.serialize_entry(classification, category)?;
        }
        map.end()
    }
}

/// The code table together with the classification index it came from.
#[derive(Debug, Clone, Default)]
pub struct CodeList {
    pub codes: CodeTable,
    pub classifications: ClassificationIndex,
}

impl CodeList {
    /// Load the code list from a workbook file.
    pub fn load(path: &Path, primary_sheet: &str) -> Result<Self> {
        let workbook = Workbook::open(path)?;
        let list = Self::from_workbook(&workbook, primary_sheet);
        info!(
            "Loaded {} codes and {} classifications from {}",
            list.codes.len(),
            list.classifications.len(),
            path.display()
        );
        Ok(list)
    }

    /// Build the code list from an already parsed workbook.
    pub fn from_workbook(workbook: &Workbook, primary_sheet: &str) -> Self {
        let mut list = CodeList::default();

        match workbook.sheet(primary_sheet) {
            Some(sheet) => list.read_primary(sheet),
            None => warn!("Sheet '{}' not found in workbook", primary_sheet),
        }

        for sheet in workbook.sheets.iter().filter(|s| s.title != primary_sheet) {
            list.read_secondary(sheet);
        }

        list
    }

    fn read_primary(&mut self, sheet: &Sheet) {
        let mut category: Option<String> = None;
        let mut classification: Option<String> = None;

        for row in sheet.rows_from(PRIMARY_FIRST_ROW) {
            if let Some(value) = row.cell(1) {
                category = Some(value.to_string());
            }
            if let Some(value) = row.cell(2) {
                classification = Some(value.to_string());
            }

            let (Some(current_category), Some(current_classification)) =
                (category.as_deref(), classification.as_deref())
            else {
                if row.cell(3).is_some() {
                    warn!(
                        "Skipping row {} of '{}': no category or classification yet",
                        row.number, sheet.title
                    );
                }
                continue;
            };

            if let (Some(code), Some(name)) = (row.cell(3), row.cell(4)) {
                match self.codes.get_mut(code) {
                    Some(entry) => entry
                        .classifications
                        .push(current_classification.to_string()),
                    None => {
                        self.codes.insert(
                            code.to_string(),
                            CodeEntry {
                                name: name.to_string(),
                                category: current_category.to_string(),
                                classifications: vec![current_classification.to_string()],
                            },
                        );
                    }
                }
            }

            self.classifications
                .insert_if_absent(current_classification, current_category);
        }
    }

    fn read_secondary(&mut self, sheet: &Sheet) {
        for row in &sheet.rows {
            if let (Some(code), Some(name)) = (row.cell(2), row.cell(3)) {
                if !self.codes.contains_key(code) {
                    debug!("Adding code {} from sheet '{}'", code, sheet.title);
                    self.codes.insert(
                        code.to_string(),
                        CodeEntry {
                            name: name.to_string(),
                            category: sheet.title.clone(),
                            classifications: vec![UNKNOWN_CLASSIFICATION.to_string()],
                        },
                    );
                }
            }
        }
    }

    /// Write `code_list.json` and `classification_list.json` into `dir`.
    pub fn write_json(&self, dir: &Path) -> Result<()> {
        write_json_atomic(&dir.join("code_list.json"), &self.codes)?;
        write_json_atomic(&dir.join("classification_list.json"), &self.classifications)?;
        debug!("Wrote code list JSON to {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::xlsx::tests::build_workbook;
    use super::*;
    use std::io::Cursor;

    fn sample_workbook() -> Workbook {
        let bytes = build_workbook(&[
            (
                DEFAULT_PRIMARY_SHEET,
                vec![
                    vec![Some("Criteria"), Some("Metric"), Some("Code"), Some("Name")],
                    vec![None, None, None, None],
                    vec![Some("Curricular"), Some("1.1"), Some("SYLB"), Some("Syllabus")],
                    vec![None, Some("1.2"), Some("RPIF"), Some("Research Project Info")],
                    vec![None, None, Some("FDBK"), Some("Feedback")],
                    vec![Some("Research"), Some("3.1"), Some("RPIF"), Some("Research Project Info")],
                    vec![None, Some("3.2"), None, None],
                ],
            ),
            (
                "Extras",
                vec![
                    vec![None, Some("MISC"), Some("Miscellaneous")],
                    vec![None, Some("SYLB"), Some("Duplicate syllabus")],
                    vec![None, Some("NONAME"), None],
                ],
            ),
        ]);
        Workbook::from_reader(Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_primary_sheet_carries_values_forward() {
        let list = CodeList::from_workbook(&sample_workbook(), DEFAULT_PRIMARY_SHEET);

        let fdbk = &list.codes["FDBK"];
        assert_eq!(fdbk.category, "Curricular");
        assert_eq!(fdbk.classifications, vec!["1.2"]);
    }

    #[test]
    fn test_repeated_code_appends_classification() {
        let list = CodeList::from_workbook(&sample_workbook(), DEFAULT_PRIMARY_SHEET);

        let rpif = &list.codes["RPIF"];
        assert_eq!(rpif.category, "Curricular");
        assert_eq!(rpif.classifications, vec!["1.2", "3.1"]);
    }

    #[test]
    fn test_classification_index_order() {
        let list = CodeList::from_workbook(&sample_workbook(), DEFAULT_PRIMARY_SHEET);

        let entries: Vec<_> = list.classifications.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("1.1", "Curricular"),
                ("1.2", "Curricular"),
                ("3.1", "Research"),
                ("3.2", "Research"),
            ]
        );
        assert_eq!(list.classifications.categories(), vec!["Curricular", "Research"]);
    }

    #[test]
    fn test_secondary_sheets_only_fill_missing_codes() {
        let list = CodeList::from_workbook(&sample_workbook(), DEFAULT_PRIMARY_SHEET);

        let misc = &list.codes["MISC"];
        assert_eq!(misc.category, "Extras");
        assert_eq!(misc.classifications, vec![UNKNOWN_CLASSIFICATION]);
        assert_eq!(list.codes["SYLB"].name, "Syllabus");
        assert!(!list.codes.contains_key("NONAME"));
    }

    #[test]
    fn test_missing_primary_sheet_uses_fallback_only() {
        let list = CodeList::from_workbook(&sample_workbook(), "Nope");
        assert!(list.classifications.is_empty());
        assert!(!list.codes.contains_key("RPIF"));
        assert_eq!(list.codes["MISC"].category, "Extras");
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let list = CodeList::from_workbook(&sample_workbook(), DEFAULT_PRIMARY_SHEET);
        list.write_json(dir.path()).unwrap();

        let codes: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("code_list.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(codes["RPIF"]["classifications"][1], "3.1");

        let classifications =
            std::fs::read_to_string(dir.path().join("classification_list.json")).unwrap();
        let first = classifications.find("1.1").unwrap();
        let last = classifications.find("3.2").unwrap();
        assert!(first < last);
    }
}
