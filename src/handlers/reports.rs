use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::errors::ServiceError;
use crate::AppState;

async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let stats = state.services.reports.dashboard().await?;
    Ok(Json(stats))
}

async fn monthly_summary(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let report = state.services.reports.monthly_summary().await?;
    Ok(Json(report))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/reports/monthly-summary", get(monthly_summary))
}
