//! Records persisted by the repository and returned by the API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Drive MIME type used for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// An academic reporting year, labelled `"{start}-{start + 1}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AcademicYear {
    pub start: i32,
}

impl AcademicYear {
    pub fn new(start: i32) -> Self {
        Self { start }
    }

    /// Academic year containing the given calendar month.
    ///
    /// January to April belong to the year that started the previous
    /// calendar year; May onwards start a new academic year.
    pub fn from_year_month(year: i32, month: u32) -> Self {
        if (1..=4).contains(&month) {
            Self::new(year - 1)
        } else {
            Self::new(year)
        }
    }

    pub fn end(&self) -> i32 {
        self.start + 1
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end())
    }
}

impl FromStr for AcademicYear {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid academic year label: {}", s))?;
        let start: i32 = start
            .trim()
            .parse()
            .map_err(|_| format!("invalid academic year label: {}", s))?;
        let end: i32 = end
            .trim()
            .parse()
            .map_err(|_| format!("invalid academic year label: {}", s))?;
        if end != start + 1 {
            return Err(format!("academic year must span one year: {}", s));
        }
        Ok(Self::new(start))
    }
}

impl From<AcademicYear> for String {
    fn from(year: AcademicYear) -> Self {
        year.to_string()
    }
}

impl TryFrom<String> for AcademicYear {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A Drive file whose name matched the naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_folder_id: String,
    pub year: AcademicYear,
    pub code: String,
}

/// A Drive file that could not be classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExemptFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_folder_id: String,
    pub reason: String,
}

/// One configured top-level Drive folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    pub web_view_link: String,
}

/// Bookkeeping for a single scan invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRun {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub folders: u64,
    pub classified: u64,
    pub exempt: u64,
    pub total: u64,
    pub missing_folders: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_academic_year_from_month() {
        assert_eq!(AcademicYear::from_year_month(2021, 3).label(), "2020-2021");
        assert_eq!(AcademicYear::from_year_month(2021, 4).label(), "2020-2021");
        assert_eq!(AcademicYear::from_year_month(2021, 5).label(), "2021-2022");
        assert_eq!(AcademicYear::from_year_month(2021, 12).label(), "2021-2022");
    }

    #[test]
    fn test_academic_year_parse() {
        assert_eq!("2022-2023".parse::<AcademicYear>(), Ok(AcademicYear::new(2022)));
        assert!("2022-2024".parse::<AcademicYear>().is_err());
        assert!("2022".parse::<AcademicYear>().is_err());
        assert!("abcd-efgh".parse::<AcademicYear>().is_err());
    }

    #[test]
    fn test_classified_file_serializes_label() {
        let file = ClassifiedFile {
            id: "1".to_string(),
            name: "20210315_RPIF_report.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            parent_folder_id: "folder".to_string(),
            year: AcademicYear::new(2020),
            code: "RPIF".to_string(),
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["year"], "2020-2021");
        assert_eq!(json["mimeType"], "application/pdf");
        assert_eq!(json["parentFolderId"], "folder");
    }
}
