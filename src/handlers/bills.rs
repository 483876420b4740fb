use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::entities::{customer, milk_entry};
use crate::errors::ServiceError;
use crate::services::billing::{self, BillPeriod};
use crate::services::invoicing::InvoiceService;
use crate::services::reports::month_bounds;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct WhatsAppDispatch {
    pub status: &'static str,
    pub message_sid: String,
}

fn parse_period(year: i32, month: u32) -> Result<(BillPeriod, NaiveDate, NaiveDate), ServiceError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ServiceError::ValidationError(format!("{year}-{month} is not a valid billing period"))
    })?;
    let (start, end) = month_bounds(first);
    Ok((BillPeriod { year, month }, start, end))
}

/// Loads the customer and their active entries, restricted to the period
/// when one is given, oldest delivery first.
async fn load_bill_inputs(
    state: &AppState,
    customer_id: i64,
    bounds: Option<(NaiveDate, NaiveDate)>,
) -> Result<(customer::Model, Vec<milk_entry::Model>), ServiceError> {
    let customer = state.services.customers.get(customer_id).await?;

    let mut query = milk_entry::Entity::active()
        .filter(milk_entry::Column::CustomerId.eq(customer_id));
    if let Some((start, end)) = bounds {
        query = query.filter(milk_entry::Column::Date.between(start, end));
    }
    let entries = query
        .order_by_asc(milk_entry::Column::Date)
        .order_by_asc(milk_entry::Column::Id)
        .all(&*state.db)
        .await?;

    Ok((customer, entries))
}

async fn render_bill(
    state: &AppState,
    customer_id: i64,
    period: Option<BillPeriod>,
    bounds: Option<(NaiveDate, NaiveDate)>,
) -> Result<impl IntoResponse, ServiceError> {
    let (customer, entries) = load_bill_inputs(state, customer_id, bounds).await?;
    let price = state.config.price_per_litre;
    let totals = billing::compute_bill(&customer, &entries, price);
    let pdf = state
        .services
        .invoices
        .render(&customer, &entries, &totals, period)?;

    let file_name = InvoiceService::file_name(&customer, period);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        pdf,
    ))
}

async fn bill_pdf_all(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    render_bill(&state, customer_id, None, None).await
}

async fn bill_pdf_month(
    State(state): State<AppState>,
    Path((customer_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    let (period, start, end) = parse_period(year, month)?;
    render_bill(&state, customer_id, Some(period), Some((start, end))).await
}

/// Sends the month's bill summary to the customer's WhatsApp number, with a
/// link to the PDF when a public base URL is configured. The bill data is
/// read-only here: a dispatch failure changes nothing.
async fn send_bill_whatsapp(
    State(state): State<AppState>,
    Path((customer_id, year, month)): Path<(i64, i32, u32)>,
) -> Result<impl IntoResponse, ServiceError> {
    let (period, start, end) = parse_period(year, month)?;
    let (customer, entries) = load_bill_inputs(&state, customer_id, Some((start, end))).await?;

    let to = customer.whatsapp_number.clone().ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "Customer {} has no WhatsApp number on record",
            customer.name
        ))
    })?;

    let totals = billing::compute_bill(&customer, &entries, state.config.price_per_litre);
    let body = format!(
        "Hello {}, your milk bill for {} is {:.2} ({} ml / {:.2} L). Total payable: {:.2}.",
        customer.name,
        period.label(),
        totals.total_amount,
        totals.total_ml,
        totals.total_litres,
        totals.total_payable,
    );
    let media_url = state.config.public_base_url.as_ref().map(|base| {
        format!(
            "{}/api/v1/customers/{}/bill-pdf/{}/{}",
            base.trim_end_matches('/'),
            customer.id,
            period.year,
            period.month
        )
    });

    let message_sid = state
        .services
        .whatsapp
        .send(&to, &body, media_url.as_deref())
        .await?;

    Ok(Json(WhatsAppDispatch {
        status: "sent",
        message_sid,
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/bill-pdf", get(bill_pdf_all))
        .route("/:id/bill-pdf/:year/:month", get(bill_pdf_month))
        .route("/:id/send-whatsapp/:year/:month", post(send_bill_whatsapp))
}
