//! Bill totals for the invoice renderer.

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::entities::{customer, milk_entry};
use crate::money;
use crate::services::reports::month_label;

/// Optional (year, month) billing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillPeriod {
    pub fn label(&self) -> String {
        month_label(self.year, self.month)
    }

    pub fn contains(&self, date: chrono::NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

/// Totals feeding the PDF invoice.
///
/// The stored balance is the running total of all active entries (including
/// this period), so `total_payable` equals `balance_amount` and
/// `previous_balance` is the carried-forward part derived by subtracting the
/// period's own charge.
#[derive(Debug, Clone, Serialize)]
pub struct BillTotals {
    pub total_ml: i64,
    pub total_litres: Decimal,
    pub total_amount: Decimal,
    pub previous_balance: Decimal,
    pub total_payable: Decimal,
}

/// Computes period totals from an already-filtered entry set.
///
/// `entries` must be active entries of `customer`, restricted to `period`
/// when one is given; this function only folds, it does not filter.
pub fn compute_bill(
    customer: &customer::Model,
    entries: &[milk_entry::Model],
    price_per_litre: Decimal,
) -> BillTotals {
    let total_ml: i64 = entries.iter().map(|e| e.quantity_ml).sum();
    let total_amount = money::round_money(money::amount_for_ml(total_ml, price_per_litre));

    BillTotals {
        total_ml,
        total_litres: money::round_litres(money::litres_from_ml(total_ml)),
        total_amount,
        previous_balance: customer.balance_amount - total_amount,
        total_payable: customer.balance_amount,
    }
}
