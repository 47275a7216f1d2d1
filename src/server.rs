use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{ADMIN_ROLE, CALLER_ID_HEADER, CALLER_ROLE_HEADER, CallerIdentity},
    config::Config,
    error::{ReportError, Result},
    report::{Report, ReportDraft, ReportPatch},
    service::{CoreService, DistrictBreakdown, YearTotals},
};

#[derive(Clone)]
pub struct AppState {
    service: Arc<CoreService>,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub year: i32,
    pub csv_data: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub year: i32,
    pub count: usize,
}

/// Build the API router. Exposed separately from [`run`] so tests can mount
/// it on an ephemeral listener.
pub fn router(service: Arc<CoreService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/api/reports", post(submit_report).get(list_reports))
        .route("/api/reports/:id", put(edit_report).delete(delete_report))
        .route("/api/reports/:id/verify", post(verify_report))
        .route("/api/reports/:id/reject", post(reject_report))
        .route("/api/disasters/upload", post(upload_disasters))
        .route("/api/disasters/:year", get(year_breakdown))
        .route("/api/stats/:year", get(year_stats))
        .route("/api/districts", get(list_districts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: &Config, service: Arc<CoreService>) -> Result<()> {
    let app = router(service);
    let listener = TcpListener::bind(&config.bind_addr).await?;
    let addr = listener.local_addr()?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {err}");
    }
}

/// Read the identity the upstream auth proxy injected. Requests without a
/// subject are unauthenticated.
fn caller(headers: &HeaderMap) -> Result<CallerIdentity> {
    let subject = headers
        .get(CALLER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ReportError::Unauthorized)?;

    let admin = headers
        .get(CALLER_ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().eq_ignore_ascii_case(ADMIN_ROLE))
        .unwrap_or(false);

    Ok(CallerIdentity::new(subject, admin))
}

fn admin_caller(headers: &HeaderMap) -> Result<CallerIdentity> {
    let identity = caller(headers)?;
    if !identity.is_admin() {
        return Err(ReportError::Forbidden);
    }
    Ok(identity)
}

async fn submit_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<ReportDraft>,
) -> Result<Json<Report>> {
    let identity = caller(&headers)?;
    let report = state.service.submit(&identity.subject, draft)?;
    Ok(Json(report))
}

async fn list_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Report>>> {
    admin_caller(&headers)?;
    Ok(Json(state.service.reports()?))
}

async fn verify_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>> {
    admin_caller(&headers)?;
    Ok(Json(state.service.verify(id)?))
}

async fn reject_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>> {
    admin_caller(&headers)?;
    Ok(Json(state.service.reject(id)?))
}

async fn edit_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<ReportPatch>,
) -> Result<Json<Report>> {
    admin_caller(&headers)?;
    Ok(Json(state.service.edit(id, patch)?))
}

async fn delete_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>> {
    admin_caller(&headers)?;
    Ok(Json(state.service.delete(id)?))
}

async fn upload_disasters(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>> {
    admin_caller(&headers)?;
    let count = state.service.import_csv(request.year, &request.csv_data)?;
    Ok(Json(UploadResponse {
        year: request.year,
        count,
    }))
}

async fn year_stats(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<YearTotals>> {
    Ok(Json(state.service.totals_for_year(year)?))
}

async fn year_breakdown(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<Vec<DistrictBreakdown>>> {
    Ok(Json(state.service.breakdown_for_year(year)?))
}

async fn list_districts(State(state): State<AppState>) -> Json<Vec<String>> {
    let districts = state.service.districts();
    Json(districts.iter().map(str::to_string).collect())
}
