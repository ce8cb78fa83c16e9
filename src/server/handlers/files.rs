//! Folder, file and code listings.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::super::AppState;
use super::{blocking, ApiResult};
use crate::codes::CodeTable;
use crate::models::{ClassifiedFile, ExemptFile, FolderRecord};
use crate::year_range::resolve_year_range;

#[derive(Debug, Clone, Deserialize)]
pub struct FileParams {
    pub code: Option<String>,
    pub years: Option<String>,
}

pub async fn list_folders(State(state): State<AppState>) -> ApiResult<Vec<FolderRecord>> {
    let repo = state.repo.clone();
    Ok(Json(blocking(move || repo.list_folders()).await?))
}

/// Classified files, optionally filtered by code and a year range query.
///
/// Without filters every file is returned. With either filter the range is
/// resolved against the stored min/max years.
pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<FileParams>,
) -> ApiResult<Vec<ClassifiedFile>> {
    let repo = state.repo.clone();
    let code = params
        .code
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty());
    let years = params.years.filter(|y| !y.trim().is_empty());

    let files = blocking(move || {
        if code.is_none() && years.is_none() {
            return repo.list_files();
        }
        let bounds = repo.year_bounds()?;
        match resolve_year_range(years.as_deref(), bounds)? {
            Some((start, end)) => repo.query_files(code.as_deref(), start, end),
            None => Ok(Vec::new()),
        }
    })
    .await?;

    Ok(Json(files))
}

pub async fn files_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Vec<ClassifiedFile>> {
    let repo = state.repo.clone();
    let code = code.to_uppercase();
    Ok(Json(blocking(move || repo.list_files_by_code(&code)).await?))
}

pub async fn list_exempt(State(state): State<AppState>) -> ApiResult<Vec<ExemptFile>> {
    let repo = state.repo.clone();
    Ok(Json(blocking(move || repo.list_exempt()).await?))
}

pub async fn list_codes(State(state): State<AppState>) -> Json<CodeTable> {
    Json(state.codes.codes.clone())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::tests::{app, get_json};

    fn ids(body: &serde_json::Value) -> Vec<String> {
        let mut ids: Vec<String> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["id"].as_str().unwrap().to_string())
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_list_files_without_filters() {
        let (status, body) = get_json(app(), "/api/files").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["a", "b", "c"]);
        assert_eq!(body[0]["parentFolderId"], "f1");
    }

    #[tokio::test]
    async fn test_list_files_year_range() {
        let (_, body) = get_json(app(), "/api/files?years=2021-2022").await;
        assert_eq!(ids(&body), vec!["b"]);

        let (_, body) = get_json(app(), "/api/files?years=2023").await;
        assert_eq!(ids(&body), vec!["c"]);
    }

    #[tokio::test]
    async fn test_list_files_code_uses_stored_bounds() {
        let (_, body) = get_json(app(), "/api/files?code=rpif").await;
        assert_eq!(ids(&body), vec!["a", "b", "c"]);

        let (_, body) = get_json(app(), "/api/files?code=ZZZZ").await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_range_is_bad_request() {
        let (status, body) = get_json(app(), "/api/files?years=2023-2021").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("2023-2021"));
    }

    #[tokio::test]
    async fn test_files_by_code_upper_cases() {
        let (status, body) = get_json(app(), "/api/files/rpif").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_folders_exempt_and_codes() {
        let (_, folders) = get_json(app(), "/api/folders").await;
        assert_eq!(folders[0]["webViewLink"], "https://drive.google.com/drive/folders/f1");

        let (_, exempt) = get_json(app(), "/api/exempt").await;
        assert_eq!(exempt[0]["reason"], "malformed_name");

        let (_, codes) = get_json(app(), "/api/codes").await;
        assert_eq!(codes["RPIF"]["category"], "Research");
    }
}
