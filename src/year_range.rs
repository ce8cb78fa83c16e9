//! Free-text year range queries such as `2021-2023` or `2021`.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// Four digit runs in the query, in order of appearance.
fn years_in(query: &str) -> Vec<i32> {
    digit_runs()
        .find_iter(query)
        .filter(|m| m.as_str().len() == 4)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Resolve a year query to an inclusive `(start, end)` range.
///
/// With no years in the query the `available` range (min/max of stored data)
/// is used; `Ok(None)` means there is nothing stored to fall back to. A single
/// year yields a one-year range. Two years are taken as start and end and must
/// be in order; more than two are rejected. Digit runs that are not exactly
/// four long, such as `20212023`, are not years and are ignored.
pub fn resolve_year_range(
    query: Option<&str>,
    available: Option<(i32, i32)>,
) -> Result<Option<(i32, i32)>> {
    let query = query.unwrap_or("");
    let years = years_in(query);

    match years.as_slice() {
        [] => Ok(available),
        [year] => Ok(Some((*year, *year))),
        [start, end] if start <= end => Ok(Some((*start, *end))),
        [_, _] => Err(Error::InvalidYearRange {
            query: query.to_string(),
            reason: "start year is after end year".to_string(),
        }),
        _ => Err(Error::InvalidYearRange {
            query: query.to_string(),
            reason: format!("expected at most two years, found {}", years.len()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_years() {
        assert_eq!(
            resolve_year_range(Some("2021-2023"), None).unwrap(),
            Some((2021, 2023))
        );
        assert_eq!(
            resolve_year_range(Some("from 2019 to 2020"), None).unwrap(),
            Some((2019, 2020))
        );
    }

    #[test]
    fn test_single_year() {
        assert_eq!(
            resolve_year_range(Some("2021"), Some((2000, 2030))).unwrap(),
            Some((2021, 2021))
        );
    }

    #[test]
    fn test_empty_query_uses_available_range() {
        assert_eq!(
            resolve_year_range(Some(""), Some((2018, 2023))).unwrap(),
            Some((2018, 2023))
        );
        assert_eq!(resolve_year_range(None, Some((2018, 2023))).unwrap(), Some((2018, 2023)));
        assert_eq!(resolve_year_range(None, None).unwrap(), None);
    }

    #[test]
    fn test_only_exact_four_digit_runs_count() {
        assert_eq!(
            resolve_year_range(Some("20210315 and 21"), Some((2000, 2001))).unwrap(),
            Some((2000, 2001))
        );
        assert_eq!(
            resolve_year_range(Some("20212023"), Some((2019, 2023))).unwrap(),
            Some((2019, 2023))
        );
        assert_eq!(resolve_year_range(Some("20212023"), None).unwrap(), None);
        assert_eq!(
            resolve_year_range(Some("FY2022"), None).unwrap(),
            Some((2022, 2022))
        );
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let err = resolve_year_range(Some("2023-2021"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidYearRange { .. }));
    }

    #[test]
    fn test_too_many_years_rejected() {
        let err = resolve_year_range(Some("2020 2021 2022"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidYearRange { .. }));
    }
}
