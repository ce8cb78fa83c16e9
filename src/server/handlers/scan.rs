//! Scan trigger.

use axum::{extract::State, http::StatusCode, Json};

use super::super::AppState;
use super::{ApiError, ApiResult};
use crate::services::{ScanSummary, Scanner};

/// Run a scan of the configured folders and return its summary.
pub async fn scan(State(state): State<AppState>) -> ApiResult<ScanSummary> {
    let Some(drive) = state.drive.clone() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Drive access is not configured",
        ));
    };
    let Ok(_guard) = state.scan_lock.try_lock() else {
        return Err(ApiError::new(StatusCode::CONFLICT, "A scan is already running"));
    };

    let scanner = Scanner::new(drive, state.repo.clone(), state.codes.clone());
    let summary = scanner.scan(&state.folders).await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::super::tests::app;

    #[tokio::test]
    async fn test_scan_without_drive_is_unavailable() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/scan")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
