//! Milk-entry mutations.
//!
//! Every mutation here changes the active entry set, so each one runs the
//! balance recalculation on the same transaction before committing. The
//! storage layer never triggers recalculation on its own; this module is
//! the responsible caller.

use chrono::{Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::db::DbPool;
use crate::entities::{customer, milk_entry};
use crate::errors::ServiceError;
use crate::services::{balance, customers::CustomerService};

/// Entry creation form: exactly one of `customer_id` (existing) or
/// `customer_name` (new) must be given.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEntryInput {
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    /// Defaults to the current local date.
    pub date: Option<NaiveDate>,
    pub quantity_ml: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEntryInput {
    pub date: Option<NaiveDate>,
    pub quantity_ml: Option<i64>,
}

/// Mutation result: the entry plus the balance the customer ended up with.
#[derive(Debug)]
pub struct EntryMutation {
    pub entry: milk_entry::Model,
    pub new_balance: Decimal,
}

#[derive(Clone)]
pub struct EntryService {
    db: Arc<DbPool>,
    price_per_litre: Decimal,
}

impl EntryService {
    pub fn new(db: Arc<DbPool>, price_per_litre: Decimal) -> Self {
        Self { db, price_per_litre }
    }

    pub fn price_per_litre(&self) -> Decimal {
        self.price_per_litre
    }

    fn validate_quantity(quantity_ml: i64) -> Result<(), ServiceError> {
        if quantity_ml < 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Records a delivery. Resolves the customer first (existing id XOR new
    /// name), then inserts and recalculates in one transaction.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewEntryInput) -> Result<EntryMutation, ServiceError> {
        Self::validate_quantity(input.quantity_ml)?;

        let named = input
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        match (input.customer_id, named) {
            (None, None) => {
                return Err(ServiceError::ValidationError(
                    "Select an existing customer or enter a new customer name".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ServiceError::ValidationError(
                    "Choose only one: existing customer or new customer name".to_string(),
                ))
            }
            _ => {}
        }

        let txn = self.db.begin().await?;
        let target = match (input.customer_id, named) {
            (Some(id), None) => customer::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Customer {id} not found")))?,
            (None, Some(name)) => CustomerService::resolve_or_create(&txn, name).await?,
            _ => unreachable!("validated above"),
        };

        let now = Utc::now();
        let entry = milk_entry::ActiveModel {
            customer_id: ActiveValue::Set(target.id),
            date: ActiveValue::Set(input.date.unwrap_or_else(|| Local::now().date_naive())),
            quantity_ml: ActiveValue::Set(input.quantity_ml),
            is_deleted: ActiveValue::Set(false),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let new_balance = balance::recalculate(&txn, target.id, self.price_per_litre).await?;
        txn.commit().await?;

        info!(entry_id = entry.id, customer_id = target.id, "entry recorded");
        Ok(EntryMutation { entry, new_balance })
    }

    /// Edits quantity and/or date on an active entry.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        entry_id: i64,
        input: UpdateEntryInput,
    ) -> Result<EntryMutation, ServiceError> {
        if let Some(q) = input.quantity_ml {
            Self::validate_quantity(q)?;
        }

        let txn = self.db.begin().await?;
        let existing = milk_entry::Entity::active()
            .filter(milk_entry::Column::Id.eq(entry_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry {entry_id} not found")))?;

        let mut active: milk_entry::ActiveModel = existing.clone().into();
        if let Some(date) = input.date {
            active.date = ActiveValue::Set(date);
        }
        if let Some(quantity_ml) = input.quantity_ml {
            active.quantity_ml = ActiveValue::Set(quantity_ml);
        }
        active.updated_at = ActiveValue::Set(Utc::now());
        let entry = active.update(&txn).await?;

        let new_balance =
            balance::recalculate(&txn, existing.customer_id, self.price_per_litre).await?;
        txn.commit().await?;

        Ok(EntryMutation { entry, new_balance })
    }

    /// Soft-deletes an active entry. The row stays and can be restored.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, entry_id: i64) -> Result<EntryMutation, ServiceError> {
        self.set_deleted(entry_id, true).await
    }

    /// Restores a soft-deleted entry. `NotFound` if the entry is live.
    #[instrument(skip(self))]
    pub async fn restore(&self, entry_id: i64) -> Result<EntryMutation, ServiceError> {
        self.set_deleted(entry_id, false).await
    }

    async fn set_deleted(&self, entry_id: i64, deleted: bool) -> Result<EntryMutation, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = milk_entry::Entity::find()
            .filter(milk_entry::Column::Id.eq(entry_id))
            .filter(milk_entry::Column::IsDeleted.eq(!deleted))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                let state = if deleted { "active" } else { "deleted" };
                ServiceError::NotFound(format!("No {state} entry {entry_id}"))
            })?;

        let entry = milk_entry::ActiveModel {
            id: ActiveValue::Unchanged(existing.id),
            is_deleted: ActiveValue::Set(deleted),
            updated_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        let new_balance =
            balance::recalculate(&txn, existing.customer_id, self.price_per_litre).await?;
        txn.commit().await?;

        info!(
            entry_id,
            deleted, %new_balance,
            "entry soft-delete state changed"
        );
        Ok(EntryMutation { entry, new_balance })
    }
}
