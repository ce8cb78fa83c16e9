//! Reports rebuilt from persisted records.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::aggregate::{naac_rollup, AggregateCounts, Aggregator, ExemptEntry, NaacRow};
use crate::codes::CodeList;
use crate::error::Result;
use crate::export::write_json_atomic;
use crate::models::AcademicYear;
use crate::repository::Repository;

/// Aggregated counts plus the exempt list.
#[derive(Debug, Serialize)]
pub struct Report {
    pub counts: AggregateCounts,
    pub exempt: Vec<ExemptEntry>,
}

/// NAAC rollup for one academic year.
#[derive(Debug, Serialize)]
pub struct NaacReport {
    pub year: AcademicYear,
    pub rows: Vec<NaacRow>,
}

/// Aggregate everything stored in the repository.
///
/// Every category of the classification index is present, even when empty.
/// Exempt entries name the folder they were found in, falling back to the
/// folder id for folders that are no longer recorded.
pub fn build_report(repo: &Repository, codes: &CodeList) -> Result<Report> {
    let mut aggregator = Aggregator::with_categories(codes.classifications.categories());

    for file in repo.list_files()? {
        aggregator.add_file(&file, &codes.codes);
    }

    let folder_names: HashMap<String, String> = repo
        .list_folders()?
        .into_iter()
        .map(|f| (f.id, f.name))
        .collect();
    for file in repo.list_exempt()? {
        let folder = folder_names
            .get(&file.parent_folder_id)
            .cloned()
            .unwrap_or(file.parent_folder_id);
        aggregator.add_exempt(file.name, folder);
    }

    let (counts, exempt) = aggregator.finish();
    Ok(Report { counts, exempt })
}

pub fn naac_report(report: &Report, codes: &CodeList, year: AcademicYear) -> NaacReport {
    NaacReport {
        year,
        rows: naac_rollup(&report.counts, &codes.codes, &codes.classifications, year),
    }
}

/// Write `data.json`, `exempt.json` and `naac.json` into `dir`.
pub fn export_report(report: &Report, naac: &NaacReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    write_json_atomic(&dir.join("data.json"), &report.counts)?;
    write_json_atomic(&dir.join("exempt.json"), &report.exempt)?;
    write_json_atomic(&dir.join("naac.json"), naac)?;
    info!("Exported report to {}", dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeEntry;
    use crate::models::{ClassifiedFile, ExemptFile, FolderRecord};

    fn code_list() -> CodeList {
        let mut list = CodeList::default();
        list.codes.insert(
            "RPIF".to_string(),
            CodeEntry {
                name: "Research Project Internal Funding".to_string(),
                category: "Research".to_string(),
                classifications: vec!["3.1.1".to_string(), "3.1.2".to_string()],
            },
        );
        list.classifications.insert_if_absent("3.1.1", "Research");
        list.classifications.insert_if_absent("3.1.2", "Research");
        list.classifications.insert_if_absent("1.1.1", "Curriculum");
        list
    }

    fn seed(repo: &Repository) {
        repo.upsert_folder(&FolderRecord {
            id: "f1".to_string(),
            name: "Criterion 3".to_string(),
            web_view_link: String::new(),
        })
        .unwrap();
        repo.upsert_file(&ClassifiedFile {
            id: "a".to_string(),
            name: "20220601_RPIF_a.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            parent_folder_id: "f1".to_string(),
            year: AcademicYear::new(2022),
            code: "RPIF".to_string(),
        })
        .unwrap();
        repo.upsert_exempt(&ExemptFile {
            id: "b".to_string(),
            name: "notes.txt".to_string(),
            mime_type: "text/plain".to_string(),
            parent_folder_id: "f1".to_string(),
            reason: "malformed_name".to_string(),
        })
        .unwrap();
        repo.upsert_exempt(&ExemptFile {
            id: "c".to_string(),
            name: "old.txt".to_string(),
            mime_type: "text/plain".to_string(),
            parent_folder_id: "gone".to_string(),
            reason: "malformed_name".to_string(),
        })
        .unwrap();
    }

    #[test]
    fn test_build_report_seeds_categories_and_resolves_folders() {
        let repo = Repository::open_in_memory().unwrap();
        seed(&repo);
        let codes = code_list();

        let report = build_report(&repo, &codes).unwrap();
        assert_eq!(report.counts.get("Research", "2022-2023", "RPIF"), 1);

        let json = serde_json::to_value(&report.counts).unwrap();
        assert_eq!(json["Curriculum"], serde_json::json!({}));

        let folders: Vec<&str> = report.exempt.iter().map(|e| e.folder_name.as_str()).collect();
        assert!(folders.contains(&"Criterion 3"));
        assert!(folders.contains(&"gone"));
    }

    #[test]
    fn test_exempt_entries_follow_scan_order() {
        let repo = Repository::open_in_memory().unwrap();
        for (id, name) in [("zz", "First scanned"), ("aa", "Second scanned")] {
            repo.upsert_folder(&FolderRecord {
                id: id.to_string(),
                name: name.to_string(),
                web_view_link: String::new(),
            })
            .unwrap();
        }
        for (id, name, folder) in [
            ("1", "zeta.pdf", "zz"),
            ("2", "alpha.pdf", "zz"),
            ("3", "mid.pdf", "aa"),
        ] {
            repo.upsert_exempt(&ExemptFile {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: "application/pdf".to_string(),
                parent_folder_id: folder.to_string(),
                reason: "malformed_name".to_string(),
            })
            .unwrap();
        }

        let report = build_report(&repo, &code_list()).unwrap();
        let entries: Vec<(&str, &str)> = report
            .exempt
            .iter()
            .map(|e| (e.file_name.as_str(), e.folder_name.as_str()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("zeta.pdf", "First scanned"),
                ("alpha.pdf", "First scanned"),
                ("mid.pdf", "Second scanned"),
            ]
        );
    }

    #[test]
    fn test_export_report_writes_files() {
        let repo = Repository::open_in_memory().unwrap();
        seed(&repo);
        let codes = code_list();
        let report = build_report(&repo, &codes).unwrap();
        let naac = naac_report(&report, &codes, AcademicYear::new(2022));

        assert_eq!(naac.rows.len(), 3);
        assert!(naac.rows.iter().filter(|r| r.count == 1).count() == 2);

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");
        export_report(&report, &naac, &out).unwrap();

        let naac_json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("naac.json")).unwrap()).unwrap();
        assert_eq!(naac_json["year"], "2022-2023");
        assert!(out.join("data.json").exists());
        assert!(out.join("exempt.json").exists());
    }
}
