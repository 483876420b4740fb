use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::entities::customer;
use crate::errors::ServiceError;
use crate::services::customers::CustomerInput;
use crate::services::reports::MonthSummary;
use crate::AppState;

/// Customer detail with the monthly breakdown the detail screen shows.
#[derive(Debug, Serialize)]
pub struct CustomerMonths {
    pub customer: customer::Model,
    pub months: Vec<MonthSummary>,
    pub total_entries: usize,
}

async fn list_customers(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let customers = state.services.customers.list().await?;
    Ok(Json(customers))
}

async fn create_customer(
    State(state): State<AppState>,
    Json(input): Json<CustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let created = state.services.customers.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.get(id).await?;
    Ok(Json(customer))
}

async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CustomerInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let updated = state.services.customers.update(id, input).await?;
    Ok(Json(updated))
}

async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.customers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn customer_months(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let customer = state.services.customers.get(id).await?;
    let months = state.services.reports.customer_months(id).await?;
    let total_entries = months.iter().map(|m| m.entries.len()).sum();
    Ok(Json(CustomerMonths {
        customer,
        months,
        total_entries,
    }))
}

async fn chart_data(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let chart = state.services.reports.chart_data(id).await?;
    Ok(Json(chart))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/:id/months", get(customer_months))
        .route("/:id/chart-data", get(chart_data))
}
