// Regional Statistics - Web Server
// JSON API for a rendering client: scopes, scoped views, geometry, quality

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use regional_stats::logging::init_logging;
use regional_stats::{
    BoundingBox, DashboardConfig, Dataset, DatasetCache, IngestionError, Ingestor,
    ScopeSelection,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    ingestor: Arc<Ingestor>,
    cache: Arc<Mutex<DatasetCache>>,
}

impl AppState {
    /// Current dataset, re-ingested when the source files changed.
    /// Hashing and parsing run on the blocking pool.
    async fn dataset(&self) -> Result<Arc<Dataset>, IngestionError> {
        let state = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut cache = state
                .cache
                .lock()
                .map_err(|_| IngestionError::unexpected("dataset cache lock poisoned"))?;
            cache.get_or_ingest(&state.ingestor)
        })
        .await
        .map_err(|e| IngestionError::unexpected(format!("ingestion task failed: {}", e)))?
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            category: None,
        }
    }
}

/// Ingestion failures replace the whole payload with the corrective message
fn ingestion_failure(err: &IngestionError) -> Response {
    error!(category = err.category().name(), "ingestion failed: {}", err);
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(err.user_message()),
        category: Some(err.category().name().to_string()),
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}

async fn respond<T: Serialize>(state: &AppState, build: impl FnOnce(&Dataset) -> T) -> Response {
    match state.dataset().await {
        Ok(dataset) => (StatusCode::OK, Json(ApiResponse::ok(build(&dataset)))).into_response(),
        Err(err) => ingestion_failure(&err),
    }
}

#[derive(Serialize)]
struct GeometryResponse {
    bounding_box: Option<BoundingBox>,
    center: Option<(f64, f64)>,
    geojson: serde_json::Value,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/scopes - Regional plus every municipality
async fn get_scopes(State(state): State<AppState>) -> Response {
    respond(&state, |dataset| dataset.scope_options()).await
}

/// GET /api/view - Regional view
async fn get_regional_view(State(state): State<AppState>) -> Response {
    respond(&state, |dataset| dataset.view(&ScopeSelection::Regional)).await
}

/// GET /api/view/:municipality - View of one municipality
async fn get_municipal_view(
    State(state): State<AppState>,
    Path(municipality): Path<String>,
) -> Response {
    // Decode URL-encoded name (accents, spaces)
    let decoded = urlencoding::decode(&municipality)
        .unwrap_or_else(|_| municipality.clone().into())
        .into_owned();

    respond(&state, |dataset| dataset.view(&ScopeSelection::Municipality(decoded))).await
}

/// GET /api/geometry - Boundaries plus map framing
async fn get_geometry(State(state): State<AppState>) -> Response {
    respond(&state, |dataset| {
        let geometry = dataset.geometry();
        let bounding_box = geometry.bounding_box();
        GeometryResponse {
            bounding_box,
            center: bounding_box.map(|b| b.center()),
            geojson: geometry.to_geojson(),
        }
    })
    .await
}

/// GET /api/quality - Data quality report
async fn get_quality(State(state): State<AppState>) -> Response {
    respond(&state, |dataset| dataset.quality()).await
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(std::env::var("STATS_JSON_LOGS").is_ok());

    let config_path = std::env::var("STATS_CONFIG").unwrap_or_else(|_| "dashboard.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        DashboardConfig::load(std::path::Path::new(&config_path))?
    } else {
        DashboardConfig::default()
    };

    let recheck_secs = std::env::var("STATS_RECHECK_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(5);

    let state = AppState {
        ingestor: Arc::new(Ingestor::new(config)),
        cache: Arc::new(Mutex::new(
            DatasetCache::new().with_recheck_interval(Duration::from_secs(recheck_secs)),
        )),
    };

    // Warm the cache; a failure here is served as 503 until the sources are fixed
    if let Err(err) = state.dataset().await {
        error!("initial ingestion failed: {}", err.user_message());
    }

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/scopes", get(get_scopes))
        .route("/view", get(get_regional_view))
        .route("/view/:municipality", get(get_municipal_view))
        .route("/geometry", get(get_geometry))
        .route("/quality", get(get_quality))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = std::env::var("STATS_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, "server listening");
    println!("🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/view", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
