//! # Sales Analytics
//!
//! Date-range reports over the same sale rows the monthly report reads.
//! Like [`crate::report`], the store fetches and this module adds up.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DateRange [start_date, end_date] ──► [start, end) in UTC               │
//! │                                                                         │
//! │  SalesTrends        inventory sales per day and per brand per day       │
//! │  MarginReport       margin by brand and product type                    │
//! │                     (RX sales count only when their cost is known)      │
//! │  SellThroughReport  sold / (sold + on hand) and units per day, by brand │
//! │  BrandPerformance   every brand: stock, sales, margin, reorder flag     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sell-through is an inventory measure: RX sales add to units sold and to
//! velocity but never to the rate, since they never came out of stock.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{mean, ratio_bps, Money};
use crate::report::{sale_lines, SaleKind, SaleLine, SaleRow};

/// Sell-through at or above which a brand is "excellent", "good", "slow".
const STATUS_THRESHOLDS_BPS: [(i64, SellThroughStatus); 3] = [
    (7500, SellThroughStatus::Excellent),
    (5000, SellThroughStatus::Good),
    (2500, SellThroughStatus::Slow),
];

/// On-hand stock below this share of the allocation triggers a reorder.
const REORDER_SHARE_BPS: i64 = 2000;

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive calendar dates, carried alongside the half-open UTC range the
/// store queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start_date: NaiveDate,
    #[ts(as = "String")]
    pub end_date: NaiveDate,
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    /// Midnight after `end_date` (exclusive).
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> CoreResult<Self> {
        if end_date < start_date {
            return Err(ValidationError::InvalidFormat {
                field: "endDate".to_string(),
                reason: "must not be before startDate".to_string(),
            }
            .into());
        }
        let after = end_date
            .succ_opt()
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "endDate".to_string(),
                reason: "out of range".to_string(),
            })?;

        Ok(DateRange {
            start_date,
            end_date,
            start: midnight(start_date),
            end: midnight(after),
        })
    }

    /// Calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Brand stock and allocation, one row per brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BrandStockRow {
    pub brand_id: i64,
    pub brand_name: String,
    pub company_name: String,
    pub allocation_quantity: i64,
    /// Sum of cached frame quantities.
    pub current_inventory: i64,
}

/// Revenue and cost for any grouping of sale lines.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    units: i64,
    revenue: Money,
    cost: Money,
}

impl Tally {
    fn add(&mut self, sale: &SaleLine) {
        self.units += sale.quantity;
        self.revenue += sale.total_revenue;
        self.cost += sale.total_cost;
    }

    fn profit(&self) -> Money {
        self.revenue - self.cost
    }

    fn margin_bps(&self) -> i64 {
        self.profit().margin_bps(self.revenue)
    }
}

/// Inventory sales always have a cost (recorded or fallback). An RX sale
/// has one only when the lab cost was entered.
fn has_cost(sale: &SaleLine) -> bool {
    sale.kind == SaleKind::Inventory || !sale.unit_cost.is_zero()
}

// =============================================================================
// Sales Trends
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub units_sold: i64,
    pub revenue: Money,
    pub avg_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandDay {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub units: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandTrend {
    pub brand_name: String,
    pub data: Vec<BrandDay>,
    pub total_revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DayRevenue {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub revenue: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TrendSummary {
    /// Days with at least one sale.
    pub total_days: usize,
    pub avg_daily_revenue: Money,
    pub best_day: Option<DayRevenue>,
    pub worst_day: Option<DayRevenue>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesTrends {
    pub range: DateRange,
    pub daily_sales: Vec<DailySales>,
    pub brand_trends: Vec<BrandTrend>,
    pub summary: TrendSummary,
}

impl SalesTrends {
    /// Inventory sales only; RX sales are reported by the monthly report.
    pub fn build(range: DateRange, rows: Vec<SaleRow>) -> Self {
        let sales = sale_lines(rows);

        let mut daily: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
        let mut by_brand: HashMap<&str, BTreeMap<NaiveDate, Tally>> = HashMap::new();
        for sale in sales.iter().filter(|s| s.kind == SaleKind::Inventory) {
            let day = sale.date.date_naive();
            daily.entry(day).or_default().add(sale);
            by_brand
                .entry(sale.brand_name.as_str())
                .or_default()
                .entry(day)
                .or_default()
                .add(sale);
        }

        let daily_sales: Vec<DailySales> = daily
            .into_iter()
            .map(|(date, t)| DailySales {
                date,
                units_sold: t.units,
                revenue: t.revenue,
                avg_price: t.revenue.average_over(t.units),
            })
            .collect();

        let mut brand_trends: Vec<BrandTrend> = by_brand
            .into_iter()
            .map(|(brand_name, days)| {
                let data: Vec<BrandDay> = days
                    .into_iter()
                    .map(|(date, t)| BrandDay {
                        date,
                        units: t.units,
                        revenue: t.revenue,
                    })
                    .collect();
                BrandTrend {
                    brand_name: brand_name.to_string(),
                    total_revenue: data.iter().map(|d| d.revenue).sum(),
                    data,
                }
            })
            .collect();
        brand_trends.sort_by(|a, b| {
            b.total_revenue
                .cmp(&a.total_revenue)
                .then_with(|| a.brand_name.cmp(&b.brand_name))
        });

        let total_revenue: Money = daily_sales.iter().map(|d| d.revenue).sum();
        let day_revenue = |d: &DailySales| DayRevenue {
            date: d.date,
            revenue: d.revenue,
        };
        // Ties go to the earliest day.
        let best_day = daily_sales
            .iter()
            .reduce(|best, d| if d.revenue > best.revenue { d } else { best })
            .map(day_revenue);
        let worst_day = daily_sales
            .iter()
            .reduce(|worst, d| if d.revenue < worst.revenue { d } else { worst })
            .map(day_revenue);

        let summary = TrendSummary {
            total_days: daily_sales.len(),
            avg_daily_revenue: total_revenue.average_over(daily_sales.len() as i64),
            best_day,
            worst_day,
        };

        SalesTrends {
            range,
            daily_sales,
            brand_trends,
            summary,
        }
    }
}

// =============================================================================
// Margins
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandMargin {
    pub brand_name: String,
    pub total_revenue: Money,
    pub total_cost: Money,
    pub gross_profit: Money,
    pub margin_bps: i64,
    pub units_sold: i64,
    pub avg_sale_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductTypeMargin {
    pub product_type: String,
    pub revenue: Money,
    pub profit: Money,
    pub margin_bps: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MarginOverview {
    pub total_revenue: Money,
    pub total_profit: Money,
    pub avg_margin_bps: i64,
    pub best_margin_brand: Option<String>,
    pub worst_margin_brand: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MarginReport {
    pub range: DateRange,
    pub by_brand: Vec<BrandMargin>,
    pub by_product_type: Vec<ProductTypeMargin>,
    pub overall: MarginOverview,
}

impl MarginReport {
    pub fn build(range: DateRange, rows: Vec<SaleRow>) -> Self {
        let sales = sale_lines(rows);

        let mut overall = Tally::default();
        let mut by_brand: HashMap<&str, Tally> = HashMap::new();
        let mut by_type: HashMap<&str, Tally> = HashMap::new();
        for sale in sales.iter().filter(|s| has_cost(s)) {
            overall.add(sale);
            by_brand.entry(sale.brand_name.as_str()).or_default().add(sale);
            by_type.entry(sale.product_type.as_str()).or_default().add(sale);
        }

        let mut brands: Vec<BrandMargin> = by_brand
            .into_iter()
            .map(|(brand_name, t)| BrandMargin {
                brand_name: brand_name.to_string(),
                total_revenue: t.revenue,
                total_cost: t.cost,
                gross_profit: t.profit(),
                margin_bps: t.margin_bps(),
                units_sold: t.units,
                avg_sale_price: t.revenue.average_over(t.units),
            })
            .collect();
        brands.sort_by(|a, b| {
            b.margin_bps
                .cmp(&a.margin_bps)
                .then_with(|| a.brand_name.cmp(&b.brand_name))
        });

        let mut product_types: Vec<ProductTypeMargin> = by_type
            .into_iter()
            .map(|(product_type, t)| ProductTypeMargin {
                product_type: product_type.to_string(),
                revenue: t.revenue,
                profit: t.profit(),
                margin_bps: t.margin_bps(),
            })
            .collect();
        product_types.sort_by(|a, b| {
            b.revenue
                .cmp(&a.revenue)
                .then_with(|| a.product_type.cmp(&b.product_type))
        });

        let overall = MarginOverview {
            total_revenue: overall.revenue,
            total_profit: overall.profit(),
            avg_margin_bps: overall.margin_bps(),
            best_margin_brand: brands.first().map(|b| b.brand_name.clone()),
            worst_margin_brand: brands.last().map(|b| b.brand_name.clone()),
        };

        MarginReport {
            range,
            by_brand: brands,
            by_product_type: product_types,
            overall,
        }
    }
}

// =============================================================================
// Brand Activity
// =============================================================================

#[derive(Debug, Default)]
struct BrandActivity {
    inventory_sold: i64,
    rx_sold: i64,
    revenue: Money,
    margin_sum_bps: i64,
    margin_count: i64,
}

impl BrandActivity {
    fn sold(&self) -> i64 {
        self.inventory_sold + self.rx_sold
    }

    /// Unweighted mean of per-sale margins.
    fn avg_margin_bps(&self) -> i64 {
        mean(self.margin_sum_bps, self.margin_count)
    }
}

fn brand_activity(sales: &[SaleLine]) -> HashMap<i64, BrandActivity> {
    let mut by_brand: HashMap<i64, BrandActivity> = HashMap::new();
    for sale in sales {
        let activity = by_brand.entry(sale.brand_id).or_default();
        match sale.kind {
            SaleKind::Inventory => activity.inventory_sold += sale.quantity,
            SaleKind::Rx => activity.rx_sold += sale.quantity,
        }
        activity.revenue += sale.total_revenue;
        if has_cost(sale) && !sale.total_revenue.is_zero() {
            activity.margin_sum_bps += sale.profit.margin_bps(sale.total_revenue);
            activity.margin_count += 1;
        }
    }
    by_brand
}

/// Inventory units sold over units sold plus units on hand.
fn sell_through_bps(inventory_sold: i64, on_hand: i64) -> i64 {
    ratio_bps(inventory_sold, inventory_sold + on_hand)
}

// =============================================================================
// Sell-through
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SellThroughStatus {
    Excellent,
    Good,
    Slow,
    Stale,
}

impl SellThroughStatus {
    pub fn from_bps(rate_bps: i64) -> Self {
        STATUS_THRESHOLDS_BPS
            .iter()
            .find(|(min, _)| rate_bps >= *min)
            .map(|&(_, status)| status)
            .unwrap_or(SellThroughStatus::Stale)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandSellThrough {
    pub brand_id: i64,
    pub brand_name: String,
    pub current_inventory: i64,
    /// Inventory and RX units.
    pub sold_in_period: i64,
    pub inventory_sold: i64,
    pub rx_sold: i64,
    pub sell_through_bps: i64,
    /// Units sold per calendar day, RX included.
    pub velocity: f64,
    pub status: SellThroughStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellThroughSummary {
    pub overall_sell_through_bps: i64,
    pub total_sold: i64,
    pub total_rx_sold: i64,
    pub fastest_moving: Option<String>,
    pub slowest_moving: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SellThroughReport {
    pub range: DateRange,
    pub days_in_period: i64,
    pub data: Vec<BrandSellThrough>,
    pub summary: SellThroughSummary,
}

impl SellThroughReport {
    /// Brands with neither stock nor sales in the range are left out.
    pub fn build(range: DateRange, brands: Vec<BrandStockRow>, rows: Vec<SaleRow>) -> Self {
        let activity = brand_activity(&sale_lines(rows));
        let days = range.days();
        let none = BrandActivity::default();

        let mut data: Vec<BrandSellThrough> = brands
            .into_iter()
            .filter_map(|brand| {
                let a = activity.get(&brand.brand_id).unwrap_or(&none);
                if brand.current_inventory <= 0 && a.sold() == 0 {
                    return None;
                }
                let rate = sell_through_bps(a.inventory_sold, brand.current_inventory);
                Some(BrandSellThrough {
                    brand_id: brand.brand_id,
                    brand_name: brand.brand_name,
                    current_inventory: brand.current_inventory,
                    sold_in_period: a.sold(),
                    inventory_sold: a.inventory_sold,
                    rx_sold: a.rx_sold,
                    sell_through_bps: rate,
                    velocity: a.sold() as f64 / days as f64,
                    status: SellThroughStatus::from_bps(rate),
                })
            })
            .collect();
        data.sort_by(|a, b| {
            b.sell_through_bps
                .cmp(&a.sell_through_bps)
                .then_with(|| a.brand_name.cmp(&b.brand_name))
        });

        let inventory_sold: i64 = data.iter().map(|b| b.inventory_sold).sum();
        let on_hand: i64 = data.iter().map(|b| b.current_inventory).sum();
        let summary = SellThroughSummary {
            overall_sell_through_bps: sell_through_bps(inventory_sold, on_hand),
            total_sold: data.iter().map(|b| b.sold_in_period).sum(),
            total_rx_sold: data.iter().map(|b| b.rx_sold).sum(),
            fastest_moving: data.first().map(|b| b.brand_name.clone()),
            slowest_moving: data.last().map(|b| b.brand_name.clone()),
        };

        SellThroughReport {
            range,
            days_in_period: days,
            data,
            summary,
        }
    }
}

// =============================================================================
// Brand Performance
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandPerformance {
    pub brand_id: i64,
    pub brand_name: String,
    pub company_name: String,
    pub allocation_quantity: i64,
    pub total_inventory: i64,
    pub total_sold: i64,
    pub inventory_sold: i64,
    pub rx_sold: i64,
    /// Inventory and RX revenue.
    pub revenue: Money,
    pub avg_margin_bps: i64,
    pub sell_through_bps: i64,
    /// On-hand stock is below a fifth of the allocation.
    pub reorder_recommended: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandPerformanceReport {
    pub range: DateRange,
    pub data: Vec<BrandPerformance>,
}

impl BrandPerformanceReport {
    /// Every brand appears, sold or not.
    pub fn build(range: DateRange, brands: Vec<BrandStockRow>, rows: Vec<SaleRow>) -> Self {
        let activity = brand_activity(&sale_lines(rows));
        let none = BrandActivity::default();

        let mut data: Vec<BrandPerformance> = brands
            .into_iter()
            .map(|brand| {
                let a = activity.get(&brand.brand_id).unwrap_or(&none);
                BrandPerformance {
                    brand_id: brand.brand_id,
                    total_sold: a.sold(),
                    inventory_sold: a.inventory_sold,
                    rx_sold: a.rx_sold,
                    revenue: a.revenue,
                    avg_margin_bps: a.avg_margin_bps(),
                    sell_through_bps: sell_through_bps(a.inventory_sold, brand.current_inventory),
                    reorder_recommended: brand.current_inventory * 10_000
                        < brand.allocation_quantity * REORDER_SHARE_BPS,
                    brand_name: brand.brand_name,
                    company_name: brand.company_name,
                    allocation_quantity: brand.allocation_quantity,
                    total_inventory: brand.current_inventory,
                }
            })
            .collect();
        data.sort_by(|a, b| {
            b.sell_through_bps
                .cmp(&a.sell_through_bps)
                .then_with(|| a.brand_name.cmp(&b.brand_name))
        });

        BrandPerformanceReport { range, data }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
