//! Balance recalculation engine.
//!
//! `balance_amount` on a customer is derived state: the 2-dp-rounded sum of
//! the amounts of all their non-deleted entries. This module is the only
//! writer of that column. Callers invoke [`recalculate`] inside the same
//! transaction as the entry mutation that invalidated the balance, so the
//! pair commits atomically and two racing requests cannot leave a stale
//! total behind.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QuerySelect,
};

use crate::entities::{customer, milk_entry};
use crate::errors::ServiceError;
use crate::money;

/// Total active millilitres for one customer.
///
/// Quantities are fetched and summed in Rust rather than with a SQL SUM so
/// the result decodes identically on SQLite and Postgres (SUM over bigint
/// yields NUMERIC on the latter).
pub async fn active_total_ml<C: ConnectionTrait>(
    conn: &C,
    customer_id: i64,
) -> Result<i64, ServiceError> {
    let quantities: Vec<i64> = milk_entry::Entity::active()
        .filter(milk_entry::Column::CustomerId.eq(customer_id))
        .select_only()
        .column(milk_entry::Column::QuantityMl)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(quantities.iter().sum())
}

/// Recomputes and persists a customer's balance from their active entries.
///
/// Idempotent: with no intervening mutation, a second call writes the same
/// value. Fails with `NotFound` if the customer no longer exists; there is
/// no partial-failure mode (one derived column on one row).
pub async fn recalculate<C: ConnectionTrait>(
    conn: &C,
    customer_id: i64,
    price_per_litre: Decimal,
) -> Result<Decimal, ServiceError> {
    let existing = customer::Entity::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {customer_id} not found")))?;

    let total_ml = active_total_ml(conn, customer_id).await?;
    // Accumulate at full precision, round exactly once.
    let new_balance = money::round_money(money::amount_for_ml(total_ml, price_per_litre));

    if new_balance != existing.balance_amount {
        let update = customer::ActiveModel {
            id: ActiveValue::Unchanged(customer_id),
            balance_amount: ActiveValue::Set(new_balance),
            updated_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        };
        update.update(conn).await?;
    }

    tracing::debug!(customer_id, %new_balance, "balance recalculated");
    Ok(new_balance)
}
