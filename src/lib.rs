//! Milkbill API Library
//!
//! Billing backend for a milk-delivery round: customers, daily entries, a
//! derived running balance per customer, monthly aggregation, PDF invoices
//! and WhatsApp dispatch.
#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod money;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthRouterExt, AuthService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: services::AppServices,
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, cfg: config::AppConfig) -> Self {
        let services = services::AppServices::new(db.clone(), &cfg);
        let auth_config = auth::AuthConfig::new(cfg.jwt_secret.clone(), cfg.jwt_expiration);
        let auth = Arc::new(AuthService::new(auth_config, db.clone()));
        Self {
            db,
            config: cfg,
            services,
            auth,
        }
    }
}

/// Builds the full application router: public login and health endpoints,
/// everything else behind bearer auth under `/api/v1`.
pub fn app_router(state: AppState) -> Router {
    let protected = Router::new()
        .nest(
            "/api/v1/customers",
            handlers::customers::routes().merge(handlers::bills::routes()),
        )
        .nest("/api/v1/entries", handlers::entries::routes())
        .nest("/api/v1", handlers::reports::routes())
        .with_auth(state.auth.clone());

    Router::new()
        .merge(protected)
        .nest("/api/v1/auth", handlers::auth::routes())
        .merge(handlers::health::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
