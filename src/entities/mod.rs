//! SeaORM entity definitions for the billing data model.

pub mod customer;
pub mod milk_entry;
pub mod user;
