//! Filename classification.
//!
//! Documents are named `<date>_<code>_<free text>`, where the date starts with
//! a four digit year and a two digit month. A name that does not follow the
//! convention, or whose code is not in the code table, is exempt.

use std::fmt;

use serde::Serialize;

use crate::codes::CodeTable;
use crate::models::AcademicYear;

/// A successfully classified name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub year: AcademicYear,
    pub code: String,
}

/// Why a file name could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExemptReason {
    /// Fewer than three `_`-separated segments.
    Malformed,
    /// The date segment does not start with a valid year and month.
    InvalidDate,
    /// The code segment is not in the code table.
    UnknownCode(String),
}

impl ExemptReason {
    /// Stable identifier stored with exempt files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExemptReason::Malformed => "malformed_name",
            ExemptReason::InvalidDate => "invalid_date",
            ExemptReason::UnknownCode(_) => "unknown_code",
        }
    }
}

impl fmt::Display for ExemptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExemptReason::Malformed => write!(f, "name is not <date>_<code>_<text>"),
            ExemptReason::InvalidDate => write!(f, "date segment is not YYYYMM..."),
            ExemptReason::UnknownCode(code) => write!(f, "unknown code {}", code),
        }
    }
}

/// Classify a file name against the code table.
pub fn classify(name: &str, codes: &CodeTable) -> Result<Classification, ExemptReason> {
    let mut parts = name.splitn(3, '_');
    let (Some(date), Some(code), Some(_rest)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ExemptReason::Malformed);
    };

    let code = code.to_uppercase();
    if !codes.contains_key(&code) {
        return Err(ExemptReason::UnknownCode(code));
    }

    let (year, month) = parse_year_month(date).ok_or(ExemptReason::InvalidDate)?;

    Ok(Classification {
        year: AcademicYear::from_year_month(year, month),
        code,
    })
}

fn parse_year_month(date: &str) -> Option<(i32, u32)> {
    let digits = date.get(..6)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = digits[..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CodeEntry;

    fn table() -> CodeTable {
        let mut codes = CodeTable::new();
        codes.insert(
            "RPIF".to_string(),
            CodeEntry {
                name: "Research Project Info".to_string(),
                category: "Research".to_string(),
                classifications: vec!["3.1".to_string()],
            },
        );
        codes
    }

    #[test]
    fn test_early_months_belong_to_previous_year() {
        let c = classify("20210315_RPIF_report.pdf", &table()).unwrap();
        assert_eq!(c.year.label(), "2020-2021");
        assert_eq!(c.code, "RPIF");
    }

    #[test]
    fn test_later_months_start_new_year() {
        let c = classify("20210915_RPIF_report.pdf", &table()).unwrap();
        assert_eq!(c.year.label(), "2021-2022");
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(
            classify("202104_RPIF_x", &table()).unwrap().year.label(),
            "2020-2021"
        );
        assert_eq!(
            classify("202105_RPIF_x", &table()).unwrap().year.label(),
            "2021-2022"
        );
    }

    #[test]
    fn test_code_is_upper_cased() {
        let c = classify("20220101_rpif_Annual Report_v2.pdf", &table()).unwrap();
        assert_eq!(c.code, "RPIF");
        assert_eq!(c.year.label(), "2021-2022");
    }

    #[test]
    fn test_malformed_names() {
        assert_eq!(classify("noformat.pdf", &table()), Err(ExemptReason::Malformed));
        assert_eq!(classify("20210315_RPIF", &table()), Err(ExemptReason::Malformed));
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            classify("20210101_XXXX_foo.pdf", &table()),
            Err(ExemptReason::UnknownCode("XXXX".to_string()))
        );
    }

    #[test]
    fn test_invalid_dates() {
        for name in [
            "2021_RPIF_short.pdf",
            "2021ab_RPIF_letters.pdf",
            "20211315_RPIF_month13.pdf",
            "20210015_RPIF_month0.pdf",
            "+20210_RPIF_sign.pdf",
        ] {
            assert_eq!(classify(name, &table()), Err(ExemptReason::InvalidDate), "{}", name);
        }
    }

    #[test]
    fn test_reason_identifiers() {
        assert_eq!(ExemptReason::Malformed.as_str(), "malformed_name");
        assert_eq!(ExemptReason::UnknownCode("X".into()).as_str(), "unknown_code");
    }
}
