//! Business services. Handlers stay thin; everything that touches the
//! database or an external system lives here.

pub mod balance;
pub mod billing;
pub mod customers;
pub mod entries;
pub mod invoicing;
pub mod notifications;
pub mod reports;

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;

/// Shared service bundle hung off the application state.
#[derive(Clone)]
pub struct AppServices {
    pub customers: Arc<customers::CustomerService>,
    pub entries: Arc<entries::EntryService>,
    pub reports: Arc<reports::ReportService>,
    pub invoices: Arc<invoicing::InvoiceService>,
    pub whatsapp: Arc<notifications::WhatsAppSender>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, cfg: &AppConfig) -> Self {
        let price: Decimal = cfg.price_per_litre;
        Self {
            customers: Arc::new(customers::CustomerService::new(db.clone())),
            entries: Arc::new(entries::EntryService::new(db.clone(), price)),
            reports: Arc::new(reports::ReportService::new(db, price)),
            invoices: Arc::new(invoicing::InvoiceService::new(price)),
            whatsapp: Arc::new(notifications::WhatsAppSender::from_config(cfg)),
        }
    }
}
