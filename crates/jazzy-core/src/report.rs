//! # Report Aggregation
//!
//! Read-side aggregation over ledger rows. The store fetches the rows; this
//! module only adds them up.
//!
//! ## Reports
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MonthlyReport (end of month)                                          │
//! │  ├── period       year, month, [start, end)                            │
//! │  ├── summary      sales, units (inventory / RX), revenue, cost, margin │
//! │  ├── brands       per-brand totals, highest revenue first              │
//! │  └── sales        SALE entries and RX sales, oldest first              │
//! │                                                                         │
//! │  InventoryHealth                                                       │
//! │  ├── statuses     frame count and share per status, display order      │
//! │  ├── aging        in-stock frames bucketed by days since invoice       │
//! │  └── oldest       ten longest-held frames                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Percentages are carried as basis points (2500 = 25.00%).

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{ratio_bps, Money};
use crate::types::{ColorScheme, FrameStatusSummary, Gender};

// =============================================================================
// Period
// =============================================================================

/// A calendar month, as a half-open UTC range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    /// First instant of the following month (exclusive).
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl ReportPeriod {
    pub fn month(year: i32, month: u32) -> CoreResult<Self> {
        if !(2000..=2100).contains(&year) {
            return Err(ValidationError::OutOfRange {
                field: "year".to_string(),
                min: 2000,
                max: 2100,
            }
            .into());
        }
        let invalid_month = || ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid_month)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid_month)?;

        Ok(ReportPeriod {
            year,
            month,
            month_name: first.format("%B").to_string(),
            start: Utc.from_utc_datetime(&first.and_time(chrono::NaiveTime::MIN)),
            end: Utc.from_utc_datetime(&next.and_time(chrono::NaiveTime::MIN)),
        })
    }

    /// The month containing `instant`.
    pub fn containing(instant: DateTime<Utc>) -> CoreResult<Self> {
        ReportPeriod::month(instant.year(), instant.month())
    }
}

// =============================================================================
// Monthly Report
// =============================================================================

/// Where a sale came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
pub enum SaleKind {
    /// A SALE entry drawn from stock.
    Inventory,
    /// A prescription frame sold to order; always one unit.
    #[serde(rename = "RX")]
    Rx,
}

/// A sale joined with its brand, as read from the store.
///
/// Inventory rows come from SALE entries; RX rows from `rx_sales`, with no
/// frame and no batch cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleRow {
    pub kind: SaleKind,
    pub id: i64,
    pub frame_id: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub brand_id: i64,
    pub brand_name: String,
    pub style_number: String,
    pub color_code: String,
    pub eye_size: String,
    pub gender: Gender,
    pub frame_type: String,
    pub product_type: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    /// Unit cost of the frame's latest ORDER/RESTOCK batch.
    pub latest_batch_cost_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLine {
    #[serde(rename = "type")]
    pub kind: SaleKind,
    pub id: i64,
    pub frame_id: Option<String>,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub brand_id: i64,
    pub brand_name: String,
    pub style_number: String,
    pub color_code: String,
    pub eye_size: String,
    pub gender: Gender,
    pub frame_type: String,
    pub product_type: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub unit_cost: Money,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub profit: Money,
}

impl SaleLine {
    /// An inventory sale recorded with zero cost is costed at the latest
    /// batch instead. RX rows carry no batch cost and keep theirs.
    pub fn from_row(row: SaleRow) -> Self {
        let unit_cost = match (row.unit_cost_cents, row.latest_batch_cost_cents) {
            (0, Some(fallback)) => Money::from_cents(fallback),
            (cost, _) => Money::from_cents(cost),
        };
        let unit_price = Money::from_cents(row.unit_price_cents);
        let total_revenue = unit_price * row.quantity;
        let total_cost = unit_cost * row.quantity;

        SaleLine {
            kind: row.kind,
            id: row.id,
            frame_id: row.frame_id,
            date: row.transaction_date,
            brand_id: row.brand_id,
            brand_name: row.brand_name,
            style_number: row.style_number,
            color_code: row.color_code,
            eye_size: row.eye_size,
            gender: row.gender,
            frame_type: row.frame_type,
            product_type: row.product_type,
            quantity: row.quantity,
            unit_price,
            unit_cost,
            total_revenue,
            total_cost,
            profit: total_revenue - total_cost,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ReportSummary {
    pub total_sales: usize,
    pub total_units: i64,
    pub inventory_units: i64,
    pub rx_units: i64,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub total_profit: Money,
    pub average_margin_bps: i64,
    pub average_sale_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandSummary {
    pub brand_name: String,
    pub units: i64,
    pub inventory_units: i64,
    pub rx_units: i64,
    pub revenue: Money,
    pub cost: Money,
    pub profit: Money,
    pub margin_bps: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthlyReport {
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    pub brand_summary: Vec<BrandSummary>,
    pub sales: Vec<SaleLine>,
}

impl MonthlyReport {
    /// Aggregates the month's inventory and RX sale rows.
    pub fn build(period: ReportPeriod, rows: Vec<SaleRow>) -> Self {
        let sales = sale_lines(rows);

        let total_revenue: Money = sales.iter().map(|s| s.total_revenue).sum();
        let total_cost: Money = sales.iter().map(|s| s.total_cost).sum();
        let total_profit = total_revenue - total_cost;
        let (inventory_units, rx_units) = split_units(&sales);
        let total_units = inventory_units + rx_units;

        let summary = ReportSummary {
            total_sales: sales.len(),
            total_units,
            inventory_units,
            rx_units,
            total_revenue,
            total_cost,
            total_profit,
            average_margin_bps: total_profit.margin_bps(total_revenue),
            average_sale_price: total_revenue.average_over(total_units),
        };

        MonthlyReport {
            period,
            summary,
            brand_summary: summarize_brands(&sales),
            sales,
        }
    }
}

/// Costs each row and orders the lines by date, inventory before RX on ties.
pub fn sale_lines(rows: Vec<SaleRow>) -> Vec<SaleLine> {
    let mut sales: Vec<SaleLine> = rows.into_iter().map(SaleLine::from_row).collect();
    sales.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.kind.cmp(&b.kind))
            .then(a.id.cmp(&b.id))
    });
    sales
}

/// (inventory units, RX units)
fn split_units<'a>(sales: impl IntoIterator<Item = &'a SaleLine>) -> (i64, i64) {
    sales
        .into_iter()
        .fold((0, 0), |(inventory, rx), sale| match sale.kind {
            SaleKind::Inventory => (inventory + sale.quantity, rx),
            SaleKind::Rx => (inventory, rx + sale.quantity),
        })
}

fn summarize_brands(sales: &[SaleLine]) -> Vec<BrandSummary> {
    let mut by_brand: HashMap<&str, BrandSummary> = HashMap::new();
    for sale in sales {
        let summary = by_brand
            .entry(sale.brand_name.as_str())
            .or_insert_with(|| BrandSummary {
                brand_name: sale.brand_name.clone(),
                units: 0,
                inventory_units: 0,
                rx_units: 0,
                revenue: Money::zero(),
                cost: Money::zero(),
                profit: Money::zero(),
                margin_bps: 0,
            });
        summary.units += sale.quantity;
        match sale.kind {
            SaleKind::Inventory => summary.inventory_units += sale.quantity,
            SaleKind::Rx => summary.rx_units += sale.quantity,
        }
        summary.revenue += sale.total_revenue;
        summary.cost += sale.total_cost;
        summary.profit += sale.profit;
    }

    let mut brands: Vec<BrandSummary> = by_brand
        .into_values()
        .map(|mut b| {
            b.margin_bps = b.profit.margin_bps(b.revenue);
            b
        })
        .collect();
    brands.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.brand_name.cmp(&b.brand_name))
    });
    brands
}

// =============================================================================
// Inventory Health
// =============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusShare {
    pub status_name: String,
    pub color_scheme: ColorScheme,
    pub count: i64,
    pub share_bps: i64,
}

/// An in-stock frame with the date of its opening order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockAgeRow {
    pub frame_id: String,
    pub brand_name: String,
    pub style_number: String,
    pub invoice_date: DateTime<Utc>,
    pub unit_cost_cents: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AgingBucket {
    pub range: String,
    pub count: i64,
    pub share_bps: i64,
    /// Retail value of the frames in the bucket.
    pub value: Money,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AgedFrame {
    pub frame_id: String,
    pub brand_name: String,
    pub style_number: String,
    pub days_in_inventory: i64,
    pub cost_price: Money,
    pub retail_price: Money,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryHealth {
    pub status_distribution: Vec<StatusShare>,
    pub aging_buckets: Vec<AgingBucket>,
    pub oldest_items: Vec<AgedFrame>,
}

/// (label, min days, max days inclusive)
const AGING_BUCKETS: [(&str, i64, i64); 5] = [
    ("0-30 days", 0, 30),
    ("31-60 days", 31, 60),
    ("61-90 days", 61, 90),
    ("91-180 days", 91, 180),
    ("180+ days", 181, i64::MAX),
];

const OLDEST_ITEMS: usize = 10;

impl InventoryHealth {
    /// `statuses` must already be in display order.
    pub fn build(
        statuses: Vec<FrameStatusSummary>,
        stock: Vec<StockAgeRow>,
        now: DateTime<Utc>,
    ) -> Self {
        let total: i64 = statuses.iter().map(|s| s.product_count).sum();
        let status_distribution = statuses
            .into_iter()
            .map(|s| StatusShare {
                share_bps: ratio_bps(s.product_count, total),
                status_name: s.status.name,
                color_scheme: s.status.color_scheme,
                count: s.product_count,
            })
            .collect();

        let mut aged: Vec<AgedFrame> = stock
            .into_iter()
            .map(|row| AgedFrame {
                days_in_inventory: (now - row.invoice_date).num_days().max(0),
                frame_id: row.frame_id,
                brand_name: row.brand_name,
                style_number: row.style_number,
                cost_price: Money::from_cents(row.unit_cost_cents),
                retail_price: Money::from_cents(row.unit_price_cents),
            })
            .collect();

        let aged_total = aged.len() as i64;
        let aging_buckets = AGING_BUCKETS
            .iter()
            .map(|&(label, min, max)| {
                let in_bucket = aged
                    .iter()
                    .filter(|f| (min..=max).contains(&f.days_in_inventory));
                let (count, value) = in_bucket.fold((0, Money::zero()), |(n, v), f| {
                    (n + 1, v + f.retail_price)
                });
                AgingBucket {
                    range: label.to_string(),
                    count,
                    share_bps: ratio_bps(count, aged_total),
                    value,
                }
            })
            .collect();

        aged.sort_by(|a, b| {
            b.days_in_inventory
                .cmp(&a.days_in_inventory)
                .then_with(|| a.frame_id.cmp(&b.frame_id))
        });
        aged.truncate(OLDEST_ITEMS);

        InventoryHealth {
            status_distribution,
            aging_buckets,
            oldest_items: aged,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::FrameStatus;

    pub(crate) fn row(id: i64, brand: &str, day: u32, qty: i64, price: i64, cost: i64) -> SaleRow {
        SaleRow {
            kind: SaleKind::Inventory,
            id,
            frame_id: Some(format!("{id}-X-Y-50")),
            transaction_date: Utc.with_ymd_and_hms(2025, 3, day, 15, 0, 0).unwrap(),
            brand_id: if brand == "Gucci" { 1001 } else { 2001 },
            brand_name: brand.to_string(),
            style_number: "X".to_string(),
            color_code: "Y".to_string(),
            eye_size: "50".to_string(),
            gender: Gender::Unisex,
            frame_type: "Metal".to_string(),
            product_type: "Optical".to_string(),
            quantity: qty,
            unit_price_cents: price,
            unit_cost_cents: cost,
            latest_batch_cost_cents: Some(8000),
        }
    }

    /// An RX sale row: one unit, no frame, no batch cost.
    pub(crate) fn rx_row(id: i64, brand: &str, day: u32, price: i64, cost: i64) -> SaleRow {
        SaleRow {
            kind: SaleKind::Rx,
            frame_id: None,
            latest_batch_cost_cents: None,
            ..row(id, brand, day, 1, price, cost)
        }
    }

    #[test]
    fn test_period_bounds() {
        let period = ReportPeriod::month(2025, 12).unwrap();
        assert_eq!(period.month_name, "December");
        assert_eq!(period.start, Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(period.end, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

        assert!(ReportPeriod::month(2025, 13).is_err());
        assert!(ReportPeriod::month(2025, 0).is_err());
        assert!(ReportPeriod::month(1999, 5).is_err());
    }

    #[test]
    fn test_monthly_totals() {
        let rows = vec![
            row(2, "Gucci", 9, 2, 25000, 10000),
            row(1, "Ray-Ban", 3, 1, 15000, 6000),
        ];

        let report = MonthlyReport::build(ReportPeriod::month(2025, 3).unwrap(), rows);

        assert_eq!(report.sales[0].id, 1);
        let s = &report.summary;
        assert_eq!(s.total_sales, 2);
        assert_eq!(s.total_units, 3);
        assert_eq!(s.total_revenue.cents(), 65000);
        assert_eq!(s.total_cost.cents(), 26000);
        assert_eq!(s.total_profit.cents(), 39000);
        assert_eq!(s.average_margin_bps, 6000);
        assert_eq!(s.average_sale_price.cents(), 21667);

        assert_eq!(report.brand_summary[0].brand_name, "Gucci");
        assert_eq!(report.brand_summary[0].revenue.cents(), 50000);
        assert_eq!(report.brand_summary[1].margin_bps, 6000);
    }

    #[test]
    fn test_zero_cost_sale_uses_latest_batch_cost() {
        let line = SaleLine::from_row(row(1, "Gucci", 1, 2, 20000, 0));
        assert_eq!(line.unit_cost.cents(), 8000);
        assert_eq!(line.profit.cents(), 24000);
    }

    #[test]
    fn test_rx_sales_merge_into_month() {
        let rows = vec![
            rx_row(1, "Gucci", 9, 40000, 0),
            row(1, "Gucci", 9, 2, 25000, 10000),
            rx_row(2, "Ray-Ban", 2, 30000, 12000),
        ];

        let report = MonthlyReport::build(ReportPeriod::month(2025, 3).unwrap(), rows);

        let kinds: Vec<_> = report.sales.iter().map(|s| (s.kind, s.id)).collect();
        assert_eq!(
            kinds,
            vec![(SaleKind::Rx, 2), (SaleKind::Inventory, 1), (SaleKind::Rx, 1)]
        );

        // An RX sale without a cost stays at zero cost
        assert_eq!(report.sales[2].unit_cost, Money::zero());
        assert_eq!(report.sales[2].frame_id, None);

        let s = &report.summary;
        assert_eq!(s.total_sales, 3);
        assert_eq!(s.total_units, 4);
        assert_eq!(s.inventory_units, 2);
        assert_eq!(s.rx_units, 2);
        assert_eq!(s.total_revenue.cents(), 120000);
        assert_eq!(s.total_cost.cents(), 32000);

        let gucci = &report.brand_summary[0];
        assert_eq!(gucci.brand_name, "Gucci");
        assert_eq!((gucci.units, gucci.inventory_units, gucci.rx_units), (3, 2, 1));
        assert_eq!(gucci.revenue.cents(), 90000);
        assert_eq!(report.brand_summary[1].rx_units, 1);
    }

    #[test]
    fn test_sale_kind_wire_names() {
        assert_eq!(serde_json::to_string(&SaleKind::Rx).unwrap(), "\"RX\"");
        assert_eq!(
            serde_json::to_string(&SaleKind::Inventory).unwrap(),
            "\"Inventory\""
        );
    }

    #[test]
    fn test_empty_month() {
        let report = MonthlyReport::build(ReportPeriod::month(2025, 2).unwrap(), Vec::new());
        assert_eq!(report.summary, ReportSummary::default());
        assert!(report.brand_summary.is_empty());
    }

    #[test]
    fn test_inventory_health() {
        let status = |id, name: &str, count| FrameStatusSummary {
            status: FrameStatus {
                id,
                name: name.to_string(),
                color_scheme: ColorScheme::Green,
                is_protected: false,
                display_order: id,
            },
            product_count: count,
        };
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap();
        let stock = |id: &str, days: i64| StockAgeRow {
            frame_id: id.to_string(),
            brand_name: "Gucci".to_string(),
            style_number: "GG0002".to_string(),
            invoice_date: now - chrono::Duration::days(days),
            unit_cost_cents: 10000,
            unit_price_cents: 25000,
        };

        let health = InventoryHealth::build(
            vec![status(1, "Active", 3), status(2, "Sold Out", 1)],
            vec![stock("a", 10), stock("b", 45), stock("c", 400)],
            now,
        );

        assert_eq!(health.status_distribution[0].share_bps, 7500);
        assert_eq!(health.status_distribution[1].share_bps, 2500);
        assert_eq!(health.aging_buckets[0].count, 1);
        assert_eq!(health.aging_buckets[1].count, 1);
        assert_eq!(health.aging_buckets[4].count, 1);
        assert_eq!(health.aging_buckets[4].value.cents(), 25000);
        assert_eq!(health.aging_buckets[0].share_bps, 3333);
        assert_eq!(health.oldest_items[0].frame_id, "c");
        assert_eq!(health.oldest_items[0].days_in_inventory, 400);
    }
}
