use crate::models::ReportKind;
use crate::repository::KlineRepository;
use crate::timeframe::Timeframe;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub struct AppState {
    pub repository: Arc<KlineRepository>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/market/:timeframe/all", get(get_all_reports))
        .route("/api/market/:timeframe/:report", get(get_report))
        .layer(cors)
        .with_state(state)
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found(message: &str) -> ApiError {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Path((timeframe, report)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let timeframe: Timeframe = timeframe
        .parse()
        .map_err(|_| bad_request("Invalid timeframe"))?;
    let kind: ReportKind = report
        .parse()
        .map_err(|_| bad_request("Unknown report"))?;

    match state.repository.get_report(timeframe, kind).await {
        Some(value) => Ok(Json(value)),
        None => Err(not_found("No data found")),
    }
}

async fn get_all_reports(
    State(state): State<Arc<AppState>>,
    Path(timeframe): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let timeframe: Timeframe = timeframe
        .parse()
        .map_err(|_| bad_request("Invalid timeframe"))?;

    let mut body = Map::new();
    let mut any_found = false;
    for kind in ReportKind::ALL {
        let value = state.repository.get_report(timeframe, kind).await;
        any_found |= value.is_some();
        body.insert(kind.response_field().to_string(), value.unwrap_or(Value::Null));
    }

    if !any_found {
        return Err(not_found("No data found for timeframe"));
    }
    Ok(Json(Value::Object(body)))
}
