use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Select;
use serde::{Deserialize, Serialize};

use crate::money;

/// One recorded milk delivery.
///
/// Entries are soft-deleted: `is_deleted` flips on, the row stays, and a
/// restore flips it back. Everything that aggregates (balances, charts,
/// reports, bills) must go through [`Entity::active`] so the filter cannot
/// be forgotten at a new call site.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "milk_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub customer_id: i64,

    pub date: NaiveDate,

    /// Delivered volume in millilitres, never negative.
    pub quantity_ml: i64,

    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Exact litres for this entry.
    pub fn litres(&self) -> Decimal {
        money::litres_from_ml(self.quantity_ml)
    }

    /// Exact (unrounded) charge for this entry at the given price.
    pub fn amount(&self, price_per_litre: Decimal) -> Decimal {
        money::amount_for_ml(self.quantity_ml, price_per_litre)
    }
}

impl Entity {
    /// The non-deleted entry set, the only set aggregations may see.
    pub fn active() -> Select<Entity> {
        Self::find().filter(Column::IsDeleted.eq(false))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "Cascade"
    )]
    Customer,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
