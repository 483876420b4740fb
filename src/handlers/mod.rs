//! HTTP handlers. Each module owns a slice of the route space and stays
//! thin: parse, delegate to a service, shape the response.

pub mod auth;
pub mod bills;
pub mod customers;
pub mod entries;
pub mod health;
pub mod reports;
