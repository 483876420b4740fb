use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::entities::milk_entry;
use crate::errors::ServiceError;
use crate::money;
use crate::services::entries::{EntryMutation, NewEntryInput, UpdateEntryInput};
use crate::AppState;

/// Body returned by every entry mutation: the entry, its own charge, and
/// the balance the owning customer ended up with.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub status: &'static str,
    pub entry: milk_entry::Model,
    pub amount: Decimal,
    pub new_balance: Decimal,
}

impl EntryResponse {
    fn new(status: &'static str, mutation: EntryMutation, price: Decimal) -> Self {
        let amount = money::round_money(mutation.entry.amount(price));
        Self {
            status,
            entry: mutation.entry,
            amount,
            new_balance: mutation.new_balance,
        }
    }
}

async fn create_entry(
    State(state): State<AppState>,
    Json(input): Json<NewEntryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let price = state.services.entries.price_per_litre();
    let mutation = state.services.entries.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(EntryResponse::new("created", mutation, price)),
    ))
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateEntryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let price = state.services.entries.price_per_litre();
    let mutation = state.services.entries.update(id, input).await?;
    Ok(Json(EntryResponse::new("updated", mutation, price)))
}

async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let price = state.services.entries.price_per_litre();
    let mutation = state.services.entries.soft_delete(id).await?;
    Ok(Json(EntryResponse::new("deleted", mutation, price)))
}

async fn restore_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let price = state.services.entries.price_per_litre();
    let mutation = state.services.entries.restore(id).await?;
    Ok(Json(EntryResponse::new("restored", mutation, price)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_entry))
        .route("/:id", put(update_entry))
        .route("/:id/delete", post(delete_entry))
        .route("/:id/restore", post(restore_entry))
}
