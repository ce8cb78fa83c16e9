//! HTTP API.

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::codes::CodeList;
use crate::drive::DriveSource;
use crate::models::AcademicYear;
use crate::repository::Repository;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub codes: Arc<CodeList>,
    /// Absent when no Drive credentials are available; scans are refused.
    pub drive: Option<Arc<dyn DriveSource>>,
    pub folders: Arc<Vec<String>>,
    pub naac_year: AcademicYear,
    scan_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        codes: Arc<CodeList>,
        drive: Option<Arc<dyn DriveSource>>,
        folders: Vec<String>,
        naac_year: AcademicYear,
    ) -> Self {
        Self {
            repo,
            codes,
            drive,
            folders: Arc::new(folders),
            naac_year,
            scan_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Build the API router.
pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::ping))
        .route("/api/folders", get(handlers::list_folders))
        .route("/api/files", get(handlers::list_files))
        .route("/api/files/:code", get(handlers::files_by_code))
        .route("/api/exempt", get(handlers::list_exempt))
        .route("/api/codes", get(handlers::list_codes))
        .route("/api/report", get(handlers::report))
        .route("/api/report/naac", get(handlers::naac))
        .route("/api/scan", post(handlers::scan))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until the process is stopped.
pub async fn serve(state: AppState, bind: SocketAddr, cors_origins: &[String]) -> std::io::Result<()> {
    let app = router(state, cors_origins);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
