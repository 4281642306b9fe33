//! # Report Repository
//!
//! Fetches rows for the end-of-month report, the date-range analytics and
//! the inventory health view; aggregation happens in `jazzy_core::report`
//! and `jazzy_core::analytics`.
//!
//! ## Sale Rows
//! ```text
//! inventory_transactions (SALE) ─┐
//!   + frame, brand, latest cost  ├── UNION ALL ──► SaleRow { kind, .. }
//! rx_sales + brand ──────────────┘                 by date, kind, id
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbResult, EngineResult};
use crate::repository::status;
use jazzy_core::analytics::{
    BrandPerformanceReport, BrandStockRow, DateRange, MarginReport, SalesTrends,
    SellThroughReport,
};
use jazzy_core::report::{InventoryHealth, MonthlyReport, ReportPeriod, SaleRow, StockAgeRow};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// SALE entries and RX sales dated within `[start, end)`.
    pub async fn sales_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<SaleRow>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT
                'INVENTORY' AS kind, t.id AS id, t.frame_id, t.transaction_date,
                f.brand_id, b.brand_name, f.style_number, f.color_code, f.eye_size,
                f.gender, f.frame_type, f.product_type,
                t.quantity, t.unit_price_cents, t.unit_cost_cents,
                (
                    SELECT c.unit_cost_cents FROM inventory_transactions c
                    WHERE c.frame_id = t.frame_id
                      AND c.transaction_type IN ('ORDER', 'RESTOCK')
                    ORDER BY c.transaction_date DESC, c.id DESC
                    LIMIT 1
                ) AS latest_batch_cost_cents
            FROM inventory_transactions t
            JOIN frames f ON f.composite_id = t.frame_id
            JOIN brands b ON b.id = f.brand_id
            WHERE t.transaction_type = 'SALE'
              AND t.transaction_date >= ?1
              AND t.transaction_date < ?2

            UNION ALL

            SELECT
                'RX' AS kind, r.id, NULL AS frame_id, r.sale_date AS transaction_date,
                r.brand_id, b.brand_name, r.style_number, r.color_code, r.eye_size,
                r.gender, r.frame_type, r.product_type,
                1 AS quantity, r.sale_price_cents AS unit_price_cents,
                r.cost_price_cents AS unit_cost_cents,
                NULL AS latest_batch_cost_cents
            FROM rx_sales r
            JOIN brands b ON b.id = r.brand_id
            WHERE r.sale_date >= ?1
              AND r.sale_date < ?2

            ORDER BY transaction_date, kind, id
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(start = %start, end = %end, count = rows.len(), "Fetched sales");
        Ok(rows)
    }

    pub async fn sales_in(&self, period: &ReportPeriod) -> DbResult<Vec<SaleRow>> {
        self.sales_between(period.start, period.end).await
    }

    /// Every brand with its company, allocation and units on hand.
    pub async fn brand_stock(&self) -> DbResult<Vec<BrandStockRow>> {
        let rows = sqlx::query_as::<_, BrandStockRow>(
            r#"
            SELECT
                b.id AS brand_id, b.brand_name, c.company_name, b.allocation_quantity,
                COALESCE(SUM(f.current_qty), 0) AS current_inventory
            FROM brands b
            JOIN companies c ON c.id = b.company_id
            LEFT JOIN frames f ON f.brand_id = b.id
            GROUP BY b.id, b.brand_name, c.company_name, b.allocation_quantity
            ORDER BY b.brand_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    pub async fn sales_trends(&self, range: DateRange) -> DbResult<SalesTrends> {
        let rows = self.sales_between(range.start, range.end).await?;
        let trends = SalesTrends::build(range, rows);
        debug!(days = trends.summary.total_days, "Sales trends built");
        Ok(trends)
    }

    pub async fn margins(&self, range: DateRange) -> DbResult<MarginReport> {
        let rows = self.sales_between(range.start, range.end).await?;
        Ok(MarginReport::build(range, rows))
    }

    pub async fn sell_through(&self, range: DateRange) -> DbResult<SellThroughReport> {
        let brands = self.brand_stock().await?;
        let rows = self.sales_between(range.start, range.end).await?;
        Ok(SellThroughReport::build(range, brands, rows))
    }

    pub async fn brand_performance(&self, range: DateRange) -> DbResult<BrandPerformanceReport> {
        let brands = self.brand_stock().await?;
        let rows = self.sales_between(range.start, range.end).await?;
        Ok(BrandPerformanceReport::build(range, brands, rows))
    }

    /// The end-of-month report for `year`/`month`.
    ///
    /// An invalid period fails before the database is touched.
    pub async fn monthly(&self, year: i32, month: u32) -> EngineResult<MonthlyReport> {
        let period = ReportPeriod::month(year, month)?;
        let rows = self.sales_in(&period).await?;
        let report = MonthlyReport::build(period, rows);

        info!(
            year,
            month,
            sales = report.summary.total_sales,
            rx_units = report.summary.rx_units,
            revenue = %report.summary.total_revenue,
            "Monthly report built"
        );
        Ok(report)
    }

    /// In-stock frames with their opening order's invoice date and prices.
    pub async fn stock_ages(&self) -> DbResult<Vec<StockAgeRow>> {
        let rows = sqlx::query_as::<_, StockAgeRow>(
            r#"
            SELECT
                f.composite_id AS frame_id,
                b.brand_name,
                f.style_number,
                COALESCE(o.invoice_date, o.transaction_date, f.created_at) AS invoice_date,
                COALESCE(o.unit_cost_cents, 0) AS unit_cost_cents,
                COALESCE(o.unit_price_cents, 0) AS unit_price_cents
            FROM frames f
            JOIN brands b ON b.id = f.brand_id
            LEFT JOIN inventory_transactions o ON o.id = (
                SELECT t.id FROM inventory_transactions t
                WHERE t.frame_id = f.composite_id AND t.transaction_type = 'ORDER'
                ORDER BY t.transaction_date, t.id
                LIMIT 1
            )
            WHERE f.current_qty > 0
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Status distribution and stock aging as of `now`.
    pub async fn inventory_health(&self, now: DateTime<Utc>) -> DbResult<InventoryHealth> {
        let statuses = status::list_with_counts(&self.pool).await?;
        let stock = self.stock_ages().await?;
        Ok(InventoryHealth::build(statuses, stock, now))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::engine::tests::{day, intent, setup, GUCCI};
    use crate::engine::InventoryEngine;
    use crate::error::EngineError;
    use chrono::{DateTime, NaiveDate, Utc};
    use jazzy_core::analytics::{DateRange, SellThroughStatus};
    use jazzy_core::report::SaleKind;
    use jazzy_core::{CoreError, Gender, Money, NewBrand, RxSaleIntent, SaleIntent};

    fn rx(price: i64, cost: Option<i64>, date: DateTime<Utc>) -> RxSaleIntent {
        RxSaleIntent {
            brand_id: 1001,
            style_number: "GG0100".to_string(),
            color_code: "BLK".to_string(),
            eye_size: "52".to_string(),
            gender: Gender::Women,
            frame_type: None,
            product_type: None,
            sale_date: Some(date),
            sale_price: Money::from_cents(price),
            cost_price: cost.map(Money::from_cents),
            notes: None,
        }
    }

    async fn sell_on(engine: &InventoryEngine, quantity: i64, price: Option<i64>, date: DateTime<Utc>) {
        engine
            .sell(
                GUCCI,
                SaleIntent {
                    quantity,
                    unit_price: price.map(Money::from_cents),
                    sale_date: Some(date),
                    notes: None,
                },
            )
            .await
            .unwrap();
    }

    fn early_march() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        )
        .unwrap()
    }

    /// Gucci: 5 received, 3 sold from stock in early March plus two RX
    /// sales (one costed). Ray-Ban: registered, never stocked.
    async fn march_activity() -> InventoryEngine {
        let (engine, _) = setup().await;
        let catalog = Catalog::new(engine.database().clone());
        let luxottica = catalog.create_company("Luxottica").await.unwrap();
        catalog
            .create_brand(NewBrand {
                id: 2001,
                brand_name: "Ray-Ban".to_string(),
                company_id: luxottica.id,
                allocation_quantity: 10,
            })
            .await
            .unwrap();

        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();
        sell_on(&engine, 2, None, day(3, 3)).await;
        sell_on(&engine, 1, Some(20000), day(3, 7)).await;
        engine.record_rx_sale(rx(40000, Some(10000), day(3, 4))).await.unwrap();
        engine.record_rx_sale(rx(30000, None, day(3, 4))).await.unwrap();
        // Outside the range
        engine.record_rx_sale(rx(50000, None, day(2, 20))).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_monthly_report_totals() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();

        engine
            .sell(GUCCI, SaleIntent { quantity: 2, ..Default::default() })
            .await
            .unwrap();
        engine
            .sell(
                GUCCI,
                SaleIntent {
                    quantity: 1,
                    unit_price: Some(Money::from_cents(20000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reports = engine.database().reports();
        let february = reports.monthly(2025, 2).await.unwrap();
        assert_eq!(february.period.month_name, "February");
        assert_eq!(february.summary.total_sales, 2);
        assert_eq!(february.summary.total_units, 3);
        assert_eq!(february.summary.total_revenue, Money::from_cents(70000));
        assert_eq!(february.summary.total_cost, Money::from_cents(30000));
        assert_eq!(february.summary.total_profit, Money::from_cents(40000));
        assert_eq!(february.brand_summary.len(), 1);
        assert_eq!(february.brand_summary[0].brand_name, "Gucci");
        assert_eq!(february.brand_summary[0].units, 3);

        let january = reports.monthly(2025, 1).await.unwrap();
        assert_eq!(january.summary.total_sales, 0);
        assert!(january.sales.is_empty());
    }

    #[tokio::test]
    async fn test_monthly_rejects_invalid_month() {
        let (engine, _) = setup().await;
        let err = engine.database().reports().monthly(2025, 13).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_inventory_health_ages_stock() {
        let (engine, _) = setup().await;
        let mut old = intent("GG0002", 3, 10000, 25000);
        old.invoice_date = Some(day(1, 1));
        engine.intake(old).await.unwrap();
        let mut fresh = intent("GG0003", 1, 12000, 30000);
        fresh.invoice_date = Some(day(3, 25));
        engine.intake(fresh).await.unwrap();

        let health = engine
            .database()
            .reports()
            .inventory_health(day(4, 1))
            .await
            .unwrap();

        let active = &health.status_distribution[0];
        assert_eq!(active.status_name, "Active");
        assert_eq!(active.count, 2);
        assert_eq!(active.share_bps, 10_000);
        assert_eq!(health.status_distribution[1].count, 0);

        let bucket = |label: &str| {
            health
                .aging_buckets
                .iter()
                .find(|b| b.range == label)
                .unwrap()
                .clone()
        };
        assert_eq!(bucket("0-30 days").count, 1);
        assert_eq!(bucket("61-90 days").count, 1);
        assert_eq!(bucket("61-90 days").value, Money::from_cents(25000));
        assert_eq!(bucket("61-90 days").share_bps, 5_000);
        assert_eq!(bucket("180+ days").count, 0);

        assert_eq!(health.oldest_items.len(), 2);
        assert_eq!(health.oldest_items[0].frame_id, GUCCI);
        assert_eq!(health.oldest_items[0].days_in_inventory, 90);
        assert_eq!(health.oldest_items[0].cost_price, Money::from_cents(10000));
    }

    #[tokio::test]
    async fn test_monthly_report_mixes_rx_sales() {
        let (engine, _) = setup().await;
        engine.intake(intent("GG0002", 5, 10000, 25000)).await.unwrap();
        sell_on(&engine, 2, None, day(2, 3)).await;
        engine.record_rx_sale(rx(40000, None, day(2, 10))).await.unwrap();
        engine.record_rx_sale(rx(30000, Some(15000), day(2, 5))).await.unwrap();
        engine.record_rx_sale(rx(99000, None, day(3, 1))).await.unwrap();

        let february = engine.database().reports().monthly(2025, 2).await.unwrap();

        let kinds: Vec<_> = february.sales.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SaleKind::Inventory, SaleKind::Rx, SaleKind::Rx]);
        assert_eq!(february.sales[0].frame_id.as_deref(), Some(GUCCI));
        assert_eq!(february.sales[1].frame_id, None);
        assert_eq!(february.sales[1].quantity, 1);
        assert_eq!(february.sales[2].unit_cost, Money::zero());

        let s = &february.summary;
        assert_eq!(s.total_sales, 3);
        assert_eq!(s.total_units, 4);
        assert_eq!(s.inventory_units, 2);
        assert_eq!(s.rx_units, 2);
        assert_eq!(s.total_revenue, Money::from_cents(120000));
        assert_eq!(s.total_cost, Money::from_cents(35000));

        let gucci = &february.brand_summary[0];
        assert_eq!((gucci.units, gucci.inventory_units, gucci.rx_units), (4, 2, 2));

        let march = engine.database().reports().monthly(2025, 3).await.unwrap();
        assert_eq!(march.summary.rx_units, 1);
        assert_eq!(march.summary.inventory_units, 0);
    }

    #[tokio::test]
    async fn test_sales_trends_over_range() {
        let engine = march_activity().await;

        let trends = engine
            .database()
            .reports()
            .sales_trends(early_march())
            .await
            .unwrap();

        assert_eq!(trends.daily_sales.len(), 2);
        assert_eq!(trends.daily_sales[0].units_sold, 2);
        assert_eq!(trends.daily_sales[0].revenue, Money::from_cents(50000));
        assert_eq!(trends.daily_sales[1].revenue, Money::from_cents(20000));
        assert_eq!(trends.brand_trends.len(), 1);
        assert_eq!(trends.summary.avg_daily_revenue, Money::from_cents(35000));
        assert_eq!(
            trends.summary.best_day.as_ref().map(|d| d.date),
            NaiveDate::from_ymd_opt(2025, 3, 3)
        );
    }

    #[tokio::test]
    async fn test_margins_over_range() {
        let engine = march_activity().await;

        let margins = engine.database().reports().margins(early_march()).await.unwrap();

        // Inventory at FIFO cost plus the costed RX sale only
        let gucci = &margins.by_brand[0];
        assert_eq!(gucci.total_revenue, Money::from_cents(110000));
        assert_eq!(gucci.total_cost, Money::from_cents(40000));
        assert_eq!(gucci.margin_bps, 6364);
        assert_eq!(gucci.units_sold, 4);
        assert_eq!(margins.by_product_type[0].product_type, "Optical");
        assert_eq!(margins.overall.best_margin_brand.as_deref(), Some("Gucci"));
    }

    #[tokio::test]
    async fn test_sell_through_over_range() {
        let engine = march_activity().await;

        let report = engine
            .database()
            .reports()
            .sell_through(early_march())
            .await
            .unwrap();

        assert_eq!(report.days_in_period, 10);
        assert_eq!(report.data.len(), 1);
        let gucci = &report.data[0];
        assert_eq!(gucci.current_inventory, 2);
        assert_eq!((gucci.inventory_sold, gucci.rx_sold), (3, 2));
        assert_eq!(gucci.sell_through_bps, 6000);
        assert_eq!(gucci.status, SellThroughStatus::Good);
        assert!((gucci.velocity - 0.5).abs() < 1e-9);
        assert_eq!(report.summary.total_rx_sold, 2);
    }

    #[tokio::test]
    async fn test_brand_performance_over_range() {
        let engine = march_activity().await;

        let report = engine
            .database()
            .reports()
            .brand_performance(early_march())
            .await
            .unwrap();

        assert_eq!(report.data.len(), 2);
        let gucci = &report.data[0];
        assert_eq!(gucci.brand_name, "Gucci");
        assert_eq!(gucci.total_sold, 5);
        assert_eq!(gucci.revenue, Money::from_cents(140000));
        // mean of 60%, 50% and 75%
        assert_eq!(gucci.avg_margin_bps, 6167);
        assert_eq!(gucci.total_inventory, 2);
        assert!(!gucci.reorder_recommended);

        let ray_ban = &report.data[1];
        assert_eq!(ray_ban.company_name, "Luxottica");
        assert_eq!(ray_ban.total_sold, 0);
        assert!(ray_ban.reorder_recommended);
    }
}
