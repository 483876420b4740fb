use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A customer on the delivery round.
///
/// `balance_amount` is derived state: it always equals the rounded sum of
/// the customer's non-deleted entry amounts and is only ever written by the
/// balance recalculation engine, never from user input.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    /// Lowercased `name`; carries the unique index so storage itself
    /// rejects names differing only in case.
    #[serde(skip_serializing)]
    pub name_lower: String,

    pub phone: Option<String>,

    /// E.164 number the invoice is WhatsApp-delivered to, when set.
    pub whatsapp_number: Option<String>,

    pub balance_amount: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::milk_entry::Entity")]
    MilkEntry,
}

impl Related<super::milk_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MilkEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
