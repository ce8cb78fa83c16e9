//! Aggregate and NAAC report handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::{blocking, ApiError, ApiResult};
use crate::aggregate::AggregateCounts;
use crate::models::AcademicYear;
use crate::services::{build_report, naac_report, NaacReport};

#[derive(Debug, Clone, Deserialize)]
pub struct NaacParams {
    pub year: Option<String>,
}

pub async fn report(State(state): State<AppState>) -> ApiResult<AggregateCounts> {
    let repo = state.repo.clone();
    let codes = state.codes.clone();
    let report = blocking(move || build_report(&repo, &codes)).await?;
    Ok(Json(report.counts))
}

/// NAAC rollup for `?year=YYYY-YYYY`, defaulting to the configured year.
pub async fn naac(
    State(state): State<AppState>,
    Query(params): Query<NaacParams>,
) -> ApiResult<NaacReport> {
    let year = match params.year.as_deref().map(str::trim) {
        Some(y) if !y.is_empty() => y.parse::<AcademicYear>().map_err(ApiError::bad_request)?,
        _ => state.naac_year,
    };

    let repo = state.repo.clone();
    let codes = state.codes.clone();
    let naac = blocking(move || {
        let report = build_report(&repo, &codes)?;
        Ok(naac_report(&report, &codes, year))
    })
    .await?;
    Ok(Json(naac))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::tests::{app, get_json};

    #[tokio::test]
    async fn test_report_counts() {
        let (status, body) = get_json(app(), "/api/report").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Research"]["2021-2022"]["RPIF"], 1);
        assert!(body.get("0").is_none());
    }

    #[tokio::test]
    async fn test_naac_defaults_to_configured_year() {
        let (_, body) = get_json(app(), "/api/report/naac").await;
        assert_eq!(body["year"], "2023-2024");
        assert_eq!(body["rows"][0]["classification"], "3.1.1");
        assert_eq!(body["rows"][0]["count"], 1);
    }

    #[tokio::test]
    async fn test_naac_year_param() {
        let (_, body) = get_json(app(), "/api/report/naac?year=2019-2020").await;
        assert_eq!(body["rows"][0]["count"], 0);

        let (status, _) = get_json(app(), "/api/report/naac?year=2019").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
