//! Monthly aggregation and reporting.
//!
//! The grouping itself ([`aggregate_by_month`]) is pure so it can be tested
//! without a database; the service wraps it with the queries that feed it.

use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use crate::db::DbPool;
use crate::entities::{customer, milk_entry};
use crate::errors::ServiceError;
use crate::money;

/// One calendar month of one customer's deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct MonthSummary {
    pub year: i32,
    pub month: u32,
    /// Human-readable period, e.g. "January 2024".
    pub label: String,
    pub total_ml: i64,
    pub total_litres: Decimal,
    pub total_amount: Decimal,
    pub entries: Vec<milk_entry::Model>,
}

/// Cross-customer row in the monthly summary report.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerMonthRow {
    pub customer_id: i64,
    pub name: String,
    pub total_ml: i64,
    pub total_litres: Decimal,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct MonthlySummaryReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub rows: Vec<CustomerMonthRow>,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_customers: u64,
    pub total_ml: i64,
    pub total_litres: Decimal,
    pub total_amount: Decimal,
    pub total_balance: Decimal,
    pub last_entries: Vec<RecentEntry>,
}

#[derive(Debug, Serialize)]
pub struct RecentEntry {
    pub id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub date: NaiveDate,
    pub quantity_ml: i64,
    pub litres: Decimal,
    pub amount: Decimal,
}

/// Series for the per-customer delivery chart.
#[derive(Debug, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

pub fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{year}-{month:02}"))
}

/// Groups entries by (year, month), most recent month first.
///
/// Per-group amounts are the sum of each entry's exact amount, rounded once
/// at the end — not a sum of already-rounded per-entry amounts. A month with
/// no entries simply does not appear.
pub fn aggregate_by_month(
    entries: &[milk_entry::Model],
    price_per_litre: Decimal,
) -> Vec<MonthSummary> {
    let mut groups: BTreeMap<(i32, u32), (i64, Decimal, Vec<milk_entry::Model>)> = BTreeMap::new();

    for entry in entries {
        let key = (entry.date.year(), entry.date.month());
        let slot = groups.entry(key).or_insert((0, Decimal::ZERO, Vec::new()));
        slot.0 += entry.quantity_ml;
        slot.1 += entry.amount(price_per_litre);
        slot.2.push(entry.clone());
    }

    groups
        .into_iter()
        .rev()
        .map(|((year, month), (total_ml, exact_amount, members))| MonthSummary {
            year,
            month,
            label: month_label(year, month),
            total_ml,
            total_litres: money::round_litres(money::litres_from_ml(total_ml)),
            total_amount: money::round_money(exact_amount),
            entries: members,
        })
        .collect()
}

/// First and last day of the month containing `today`.
pub fn month_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.with_day(1).expect("day 1 always valid");
    let (next_year, next_month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("month start always valid")
        .pred_opt()
        .expect("not date MIN");
    (start, end)
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
    price_per_litre: Decimal,
}

impl ReportService {
    pub fn new(db: Arc<DbPool>, price_per_litre: Decimal) -> Self {
        Self { db, price_per_litre }
    }

    /// Per-customer monthly breakdown, newest month first.
    #[instrument(skip(self))]
    pub async fn customer_months(&self, customer_id: i64) -> Result<Vec<MonthSummary>, ServiceError> {
        // Existence check keeps "no entries" distinct from "no customer".
        customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {customer_id} not found")))?;

        let entries = milk_entry::Entity::active()
            .filter(milk_entry::Column::CustomerId.eq(customer_id))
            .order_by_desc(milk_entry::Column::Date)
            .all(&*self.db)
            .await?;

        Ok(aggregate_by_month(&entries, self.price_per_litre))
    }

    /// Current-month totals per customer, rows sorted by name.
    #[instrument(skip(self))]
    pub async fn monthly_summary(&self) -> Result<MonthlySummaryReport, ServiceError> {
        let (start, end) = month_bounds(Local::now().date_naive());

        let entries = milk_entry::Entity::active()
            .filter(milk_entry::Column::Date.between(start, end))
            .find_also_related(customer::Entity)
            .all(&*self.db)
            .await?;

        let mut per_customer: BTreeMap<i64, (String, i64, Decimal)> = BTreeMap::new();
        for (entry, owner) in entries {
            let name = owner.map(|c| c.name).unwrap_or_default();
            let slot = per_customer
                .entry(entry.customer_id)
                .or_insert((name, 0, Decimal::ZERO));
            slot.1 += entry.quantity_ml;
            slot.2 += entry.amount(self.price_per_litre);
        }

        let mut rows: Vec<CustomerMonthRow> = per_customer
            .into_iter()
            .map(|(customer_id, (name, total_ml, exact_amount))| CustomerMonthRow {
                customer_id,
                name,
                total_ml,
                total_litres: money::round_litres(money::litres_from_ml(total_ml)),
                total_amount: money::round_money(exact_amount),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));

        let total_amount = money::round_money(
            rows.iter().map(|r| r.total_amount).sum::<Decimal>(),
        );

        Ok(MonthlySummaryReport {
            start,
            end,
            rows,
            total_amount,
        })
    }

    /// Headline numbers plus the ten most recent active entries.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardStats, ServiceError> {
        use sea_orm::PaginatorTrait;

        let total_customers = customer::Entity::find().count(&*self.db).await?;

        let quantities: Vec<i64> = milk_entry::Entity::active()
            .select_only()
            .column(milk_entry::Column::QuantityMl)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let total_ml: i64 = quantities.iter().sum();

        let balances: Vec<Decimal> = customer::Entity::find()
            .select_only()
            .column(customer::Column::BalanceAmount)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let total_balance = money::round_money(balances.iter().copied().sum());

        let recent = milk_entry::Entity::active()
            .order_by_desc(milk_entry::Column::Date)
            .order_by_desc(milk_entry::Column::Id)
            .limit(10)
            .find_also_related(customer::Entity)
            .all(&*self.db)
            .await?;

        let last_entries = recent
            .into_iter()
            .map(|(entry, owner)| RecentEntry {
                id: entry.id,
                customer_id: entry.customer_id,
                customer_name: owner.map(|c| c.name).unwrap_or_default(),
                date: entry.date,
                quantity_ml: entry.quantity_ml,
                litres: money::round_litres_fine(entry.litres()),
                amount: money::round_money(entry.amount(self.price_per_litre)),
            })
            .collect();

        Ok(DashboardStats {
            total_customers,
            total_ml,
            total_litres: money::round_litres(money::litres_from_ml(total_ml)),
            total_amount: money::round_money(money::amount_for_ml(total_ml, self.price_per_litre)),
            total_balance,
            last_entries,
        })
    }

    /// Litres series over the customer's last 30 active entries, oldest of
    /// the window first.
    #[instrument(skip(self))]
    pub async fn chart_data(&self, customer_id: i64) -> Result<ChartData, ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {customer_id} not found")))?;

        let mut window = milk_entry::Entity::active()
            .filter(milk_entry::Column::CustomerId.eq(customer_id))
            .order_by_desc(milk_entry::Column::Date)
            .order_by_desc(milk_entry::Column::Id)
            .limit(30)
            .all(&*self.db)
            .await?;
        window.reverse();

        let labels = window
            .iter()
            .map(|e| e.date.format("%Y-%m-%d").to_string())
            .collect();
        let data = window
            .iter()
            .map(|e| e.litres().to_f64().unwrap_or(0.0))
            .collect();
        Ok(ChartData { labels, data })
    }
}
