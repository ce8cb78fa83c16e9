//! Folder scanning: list Drive folders, classify every file, persist results.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::aggregate::ExemptEntry;
use crate::classify::{classify, ExemptReason};
use crate::codes::CodeList;
use crate::drive::{DriveFile, DriveSource};
use crate::error::{Error, Result};
use crate::models::{ClassifiedFile, ExemptFile, FolderRecord, ScanRun, FOLDER_MIME_TYPE};
use crate::repository::Repository;

/// Progress events emitted while scanning.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    FolderStarted { name: String },
    FolderMissing { name: String },
    FileClassified { name: String, code: String },
    FileExempt { name: String, reason: String },
    FolderFinished { name: String, files: u64 },
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub run_id: String,
    pub folders: u64,
    pub classified: u64,
    pub exempt: u64,
    pub total: u64,
    pub missing_folders: u64,
    pub exempt_entries: Vec<ExemptEntry>,
}

/// A file classified on one page, waiting to be written.
enum Record {
    Classified(ClassifiedFile),
    Exempt(ExemptFile, ExemptReason),
}

/// Scans configured folders into the repository.
pub struct Scanner {
    drive: Arc<dyn DriveSource>,
    repo: Arc<Repository>,
    codes: Arc<CodeList>,
    events: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl Scanner {
    pub fn new(drive: Arc<dyn DriveSource>, repo: Arc<Repository>, codes: Arc<CodeList>) -> Self {
        Self {
            drive,
            repo,
            codes,
            events: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.events {
            // Receiver may have gone away; progress is best effort
            let _ = tx.send(event);
        }
    }

    /// Run repository work on the blocking pool.
    async fn with_repo<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let repo = self.repo.clone();
        tokio::task::spawn_blocking(move || f(&repo))
            .await
            .map_err(|e| Error::Other(format!("repository task failed: {}", e)))?
    }

    /// Scan every named folder, upserting each direct child as classified
    /// or exempt. Nested folders are not descended into.
    pub async fn scan(&self, folder_names: &[String]) -> Result<ScanSummary> {
        let started_at = Utc::now();
        let mut summary = ScanSummary {
            run_id: uuid::Uuid::new_v4().to_string(),
            ..Default::default()
        };

        for name in folder_names {
            let Some(folder) = self.drive.find_folder(name).await? else {
                warn!("Folder '{}' not found in Drive", name);
                summary.missing_folders += 1;
                self.emit(ScanEvent::FolderMissing { name: name.clone() });
                continue;
            };

            info!("Scanning folder '{}' ({})", folder.name, folder.id);
            self.emit(ScanEvent::FolderStarted {
                name: folder.name.clone(),
            });
            let record = FolderRecord {
                id: folder.id.clone(),
                name: folder.name.clone(),
                web_view_link: folder.web_view_link.clone(),
            };
            self.with_repo(move |repo| repo.upsert_folder(&record)).await?;
            summary.folders += 1;

            let mut files_in_folder = 0;
            let mut page_token: Option<String> = None;
            loop {
                let page = self
                    .drive
                    .list_children(&folder.id, page_token.as_deref())
                    .await?;

                let records: Vec<Record> = page
                    .files
                    .iter()
                    .filter(|file| {
                        if file.mime_type == FOLDER_MIME_TYPE {
                            debug!("Skipping nested folder '{}'", file.name);
                            return false;
                        }
                        true
                    })
                    .map(|file| self.classify_file(file, &folder.id))
                    .collect();

                // One blocking write per page keeps SQLite off the runtime threads
                let records = self
                    .with_repo(move |repo| {
                        for record in &records {
                            match record {
                                Record::Classified(file) => repo.upsert_file(file)?,
                                Record::Exempt(file, _) => repo.upsert_exempt(file)?,
                            }
                        }
                        Ok(records)
                    })
                    .await?;

                for record in records {
                    self.tally(record, &folder.name, &mut summary);
                    files_in_folder += 1;
                }

                match page.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }

            info!("Folder '{}': {} files", folder.name, files_in_folder);
            self.emit(ScanEvent::FolderFinished {
                name: folder.name.clone(),
                files: files_in_folder,
            });
        }

        summary.total = summary.classified + summary.exempt;
        let run = ScanRun {
            id: summary.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            folders: summary.folders,
            classified: summary.classified,
            exempt: summary.exempt,
            total: summary.total,
            missing_folders: summary.missing_folders,
        };
        self.with_repo(move |repo| repo.record_scan_run(&run)).await?;

        info!(
            "Scan {} finished: {} classified, {} exempt, {} missing folders",
            summary.run_id, summary.classified, summary.exempt, summary.missing_folders
        );
        Ok(summary)
    }

    fn classify_file(&self, file: &DriveFile, folder_id: &str) -> Record {
        match classify(&file.name, &self.codes.codes) {
            Ok(classification) => {
                debug!(
                    "{} -> {} {}",
                    file.name, classification.year, classification.code
                );
                Record::Classified(ClassifiedFile {
                    id: file.id.clone(),
                    name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                    parent_folder_id: folder_id.to_string(),
                    year: classification.year,
                    code: classification.code,
                })
            }
            Err(reason) => {
                debug!("{} exempt: {}", file.name, reason);
                Record::Exempt(
                    ExemptFile {
                        id: file.id.clone(),
                        name: file.name.clone(),
                        mime_type: file.mime_type.clone(),
                        parent_folder_id: folder_id.to_string(),
                        reason: reason.as_str().to_string(),
                    },
                    reason,
                )
            }
        }
    }

    fn tally(&self, record: Record, folder_name: &str, summary: &mut ScanSummary) {
        match record {
            Record::Classified(file) => {
                summary.classified += 1;
                self.emit(ScanEvent::FileClassified {
                    name: file.name,
                    code: file.code,
                });
            }
            Record::Exempt(file, reason) => {
                summary.exempt += 1;
                summary.exempt_entries.push(ExemptEntry {
                    file_name: file.name.clone(),
                    folder_name: folder_name.to_string(),
                });
                self.emit(ScanEvent::FileExempt {
                    name: file.name,
                    reason: reason.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeEntry;
    use crate::drive::{DriveFolder, FilePage};
    use crate::models::AcademicYear;
    use async_trait::async_trait;

    struct OneFolder;

    #[async_trait]
    impl DriveSource for OneFolder {
        async fn find_folder(&self, name: &str) -> Result<Option<DriveFolder>> {
            Ok((name == "Criterion 3").then(|| DriveFolder {
                id: "f1".to_string(),
                name: "Criterion 3 - Research".to_string(),
                web_view_link: "https://drive.google.com/drive/folders/f1".to_string(),
            }))
        }

        async fn list_children(&self, _folder_id: &str, page_token: Option<&str>) -> Result<FilePage> {
            let file = |id: &str, name: &str, mime: &str| DriveFile {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: mime.to_string(),
            };
            Ok(match page_token {
                None => FilePage {
                    files: vec![
                        file("a", "20210315_rpif_report.pdf", "application/pdf"),
                        file("b", "minutes.pdf", "application/pdf"),
                    ],
                    next_page_token: Some("p2".to_string()),
                },
                Some(_) => FilePage {
                    files: vec![
                        file("c", "20210915_RPIF_grant.pdf", "application/pdf"),
                        file("d", "Archive", FOLDER_MIME_TYPE),
                    ],
                    next_page_token: None,
                },
            })
        }

        async fn export_file(&self, _file_id: &str, _mime_type: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn code_list() -> CodeList {
        let mut list = CodeList::default();
        list.codes.insert(
            "RPIF".to_string(),
            CodeEntry {
                name: "Research Project Internal Funding".to_string(),
                category: "Research".to_string(),
                classifications: vec!["3.1.1".to_string()],
            },
        );
        list
    }

    #[tokio::test]
    async fn test_repository_work_runs_off_the_runtime_thread() {
        let repo = Arc::new(Repository::open_in_memory().unwrap());
        let scanner = Scanner::new(Arc::new(OneFolder), repo, Arc::new(code_list()));

        let runtime_thread = std::thread::current().id();
        let repo_thread = scanner
            .with_repo(|repo| {
                repo.count_files()?;
                Ok(std::thread::current().id())
            })
            .await
            .unwrap();
        assert_ne!(repo_thread, runtime_thread);
    }

    #[tokio::test]
    async fn test_scan_pages_and_classifies() {
        let repo = Arc::new(Repository::open_in_memory().unwrap());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scanner = Scanner::new(Arc::new(OneFolder), repo.clone(), Arc::new(code_list()))
            .with_events(tx);

        let summary = scanner
            .scan(&["Criterion 3".to_string(), "Criterion 9".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.folders, 1);
        assert_eq!(summary.missing_folders, 1);
        assert_eq!(summary.classified, 2);
        assert_eq!(summary.exempt, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.exempt_entries,
            vec![ExemptEntry {
                file_name: "minutes.pdf".to_string(),
                folder_name: "Criterion 3 - Research".to_string(),
            }]
        );

        let first = repo.get_file("a").unwrap().unwrap();
        assert_eq!(first.code, "RPIF");
        assert_eq!(first.year, AcademicYear::new(2020));
        assert_eq!(repo.get_file("c").unwrap().unwrap().year, AcademicYear::new(2021));
        assert!(repo.get_file("d").unwrap().is_none());
        assert_eq!(repo.list_exempt().unwrap()[0].reason, "malformed_name");

        let run = repo.latest_scan_run().unwrap().unwrap();
        assert_eq!(run.id, summary.run_id);
        assert_eq!(run.total, 3);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events[0], ScanEvent::FolderStarted { .. }));
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::FolderMissing { name } if name == "Criterion 9")));
        assert!(events
            .iter()
            .any(|e| matches!(e, ScanEvent::FolderFinished { files: 3, .. })));
    }
}
