//! Customer management: normalization, uniqueness, resolve-or-create, and
//! the customer-facing list/detail queries.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::db::DbPool;
use crate::entities::{customer, milk_entry};
use crate::errors::ServiceError;
use crate::money;

/// Collapses internal whitespace and trims, so " Ram  Kumar " and
/// "Ram Kumar" are the same name.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    pub phone: Option<String>,
    pub whatsapp_number: Option<String>,
}

/// Customer row enriched with its active delivered volume, for the list view.
#[derive(Debug, Serialize)]
pub struct CustomerWithUsage {
    #[serde(flatten)]
    pub customer: customer::Model,
    pub total_ml: i64,
    pub total_litres: Decimal,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DbPool>,
}

impl CustomerService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Case-insensitive lookup by normalized name, via the canonical
    /// lowercased column that also carries the unique index.
    pub async fn find_by_name<C: ConnectionTrait>(
        conn: &C,
        name: &str,
    ) -> Result<Option<customer::Model>, ServiceError> {
        let normalized = normalize_name(name);
        let found = customer::Entity::find()
            .filter(customer::Column::NameLower.eq(normalized.to_lowercase()))
            .one(conn)
            .await?;
        Ok(found)
    }

    /// Returns the customer with this name, creating one if none exists.
    ///
    /// This is the explicit resolution step entry creation goes through; it
    /// runs on the caller's transaction so the duplicate check and the
    /// insert cannot be split by a concurrent request.
    pub async fn resolve_or_create<C: ConnectionTrait>(
        conn: &C,
        name: &str,
    ) -> Result<customer::Model, ServiceError> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return Err(ServiceError::ValidationError(
                "Customer name must not be empty".to_string(),
            ));
        }
        if let Some(existing) = Self::find_by_name(conn, &normalized).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let created = customer::ActiveModel {
            name: ActiveValue::Set(normalized.clone()),
            name_lower: ActiveValue::Set(normalized.to_lowercase()),
            phone: ActiveValue::Set(None),
            whatsapp_number: ActiveValue::Set(None),
            balance_amount: ActiveValue::Set(Decimal::ZERO),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        info!(customer_id = created.id, name = %normalized, "customer created implicitly");
        Ok(created)
    }

    /// Creates a customer from an explicit form submission. Unlike
    /// [`Self::resolve_or_create`], a name collision here is an error.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CustomerInput) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let normalized = normalize_name(&input.name);
        if normalized.is_empty() {
            return Err(ServiceError::ValidationError(
                "Customer name must not be empty".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        if Self::find_by_name(&txn, &normalized).await?.is_some() {
            return Err(ServiceError::DuplicateName(normalized));
        }

        let now = Utc::now();
        let created = customer::ActiveModel {
            name: ActiveValue::Set(normalized.clone()),
            name_lower: ActiveValue::Set(normalized.to_lowercase()),
            phone: ActiveValue::Set(input.phone),
            whatsapp_number: ActiveValue::Set(input.whatsapp_number),
            balance_amount: ActiveValue::Set(Decimal::ZERO),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(customer_id = created.id, "customer created");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {id} not found")))
    }

    /// All customers, newest first, each with its active delivered volume.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CustomerWithUsage>, ServiceError> {
        let customers = customer::Entity::find()
            .order_by_desc(customer::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let volumes: Vec<(i64, i64)> = milk_entry::Entity::active()
            .select_only()
            .column(milk_entry::Column::CustomerId)
            .column(milk_entry::Column::QuantityMl)
            .into_tuple()
            .all(&*self.db)
            .await?;

        let mut per_customer: HashMap<i64, i64> = HashMap::new();
        for (customer_id, quantity_ml) in volumes {
            *per_customer.entry(customer_id).or_insert(0) += quantity_ml;
        }

        Ok(customers
            .into_iter()
            .map(|c| {
                let total_ml = per_customer.get(&c.id).copied().unwrap_or(0);
                CustomerWithUsage {
                    total_ml,
                    total_litres: money::round_litres(money::litres_from_ml(total_ml)),
                    customer: c,
                }
            })
            .collect())
    }

    /// Updates name/contact fields. `balance_amount` is not touchable here.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i64,
        input: CustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        input.validate()?;
        let normalized = normalize_name(&input.name);
        if normalized.is_empty() {
            return Err(ServiceError::ValidationError(
                "Customer name must not be empty".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let existing = customer::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {id} not found")))?;

        if let Some(other) = Self::find_by_name(&txn, &normalized).await? {
            if other.id != existing.id {
                return Err(ServiceError::DuplicateName(normalized));
            }
        }

        let updated = customer::ActiveModel {
            id: ActiveValue::Unchanged(id),
            name: ActiveValue::Set(normalized.clone()),
            name_lower: ActiveValue::Set(normalized.to_lowercase()),
            phone: ActiveValue::Set(input.phone),
            whatsapp_number: ActiveValue::Set(input.whatsapp_number),
            updated_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        }
        .update(&txn)
        .await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Hard-deletes a customer and all their entries, soft-deleted ones
    /// included. The explicit child delete keeps the cascade observable on
    /// backends where the FK pragma might be off.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = customer::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {id} not found")))?;

        milk_entry::Entity::delete_many()
            .filter(milk_entry::Column::CustomerId.eq(id))
            .exec(&txn)
            .await?;
        customer::Entity::delete_by_id(existing.id).exec(&txn).await?;
        txn.commit().await?;

        info!(customer_id = id, "customer deleted");
        Ok(())
    }
}
