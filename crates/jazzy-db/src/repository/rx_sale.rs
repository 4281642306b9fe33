//! # RX Sale Repository
//!
//! Reads and appends against `rx_sales`. Recording goes through
//! [`InventoryEngine::record_rx_sale`](crate::engine::InventoryEngine::record_rx_sale),
//! which checks the brand inside a unit of work.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use jazzy_core::rx::{NewRxSale, Pagination, RxSale, RxSalePage};

const RX_SELECT: &str = r#"
    SELECT
        r.id, r.brand_id, b.brand_name, r.style_number, r.color_code, r.eye_size,
        r.gender, r.frame_type, r.product_type, r.sale_date,
        r.sale_price_cents, r.cost_price_cents, r.notes, r.created_at
    FROM rx_sales r
    JOIN brands b ON b.id = r.brand_id
"#;

#[derive(Debug, Clone)]
pub struct RxSaleRepository {
    pool: SqlitePool,
}

impl RxSaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RxSaleRepository { pool }
    }

    /// One page of RX sales, newest first. `page` counts from 1.
    pub async fn list(&self, page: u32, limit: u32) -> DbResult<RxSalePage> {
        let pagination = Pagination::new(page, limit, self.count().await?);

        let sql = format!("{RX_SELECT} ORDER BY r.sale_date DESC, r.id DESC LIMIT ?1 OFFSET ?2");
        let rx_sales = sqlx::query_as::<_, RxSale>(&sql)
            .bind(i64::from(pagination.limit))
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await?;

        debug!(
            page = pagination.page,
            count = rx_sales.len(),
            total = pagination.total_count,
            "Fetched RX sales"
        );
        Ok(RxSalePage {
            rx_sales,
            pagination,
        })
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<RxSale>> {
        fetch(&self.pool, id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rx_sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Executor Functions
// =============================================================================

/// Appends an RX sale and returns its id.
pub async fn insert<'e>(db: impl SqliteExecutor<'e>, sale: &NewRxSale) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO rx_sales (
            brand_id, style_number, color_code, eye_size, gender, frame_type,
            product_type, sale_date, sale_price_cents, cost_price_cents, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(sale.brand_id)
    .bind(&sale.style_number)
    .bind(&sale.color_code)
    .bind(&sale.eye_size)
    .bind(sale.gender)
    .bind(&sale.frame_type)
    .bind(&sale.product_type)
    .bind(sale.sale_date)
    .bind(sale.sale_price_cents)
    .bind(sale.cost_price_cents)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .execute(db)
    .await?;

    let id = result.last_insert_rowid();
    debug!(id, brand_id = sale.brand_id, "RX sale appended");
    Ok(id)
}

pub async fn fetch<'e>(db: impl SqliteExecutor<'e>, id: i64) -> DbResult<Option<RxSale>> {
    let sql = format!("{RX_SELECT} WHERE r.id = ?1");
    let sale = sqlx::query_as::<_, RxSale>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(sale)
}

#[cfg(test)]
mod tests {
    use crate::engine::tests::{day, setup};
    use crate::error::EngineError;
    use jazzy_core::{CoreError, Gender, Money, RxSaleIntent};

    fn rx(style: &str, price: i64) -> RxSaleIntent {
        RxSaleIntent {
            brand_id: 1001,
            style_number: style.to_string(),
            color_code: "BLK".to_string(),
            eye_size: "52".to_string(),
            gender: Gender::default(),
            frame_type: None,
            product_type: None,
            sale_date: None,
            sale_price: Money::from_cents(price),
            cost_price: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_record_rx_sale_defaults() {
        let (engine, _) = setup().await;

        let sale = engine.record_rx_sale(rx("GG0010", 42000)).await.unwrap();

        assert_eq!(sale.brand_name, "Gucci");
        assert_eq!(sale.gender, Gender::Unisex);
        assert_eq!(sale.frame_type, "Zyl");
        assert_eq!(sale.product_type, "Optical");
        assert_eq!(sale.cost_price_cents, 0);
        assert_eq!(sale.sale_price(), Money::from_cents(42000));
        // FixedClock in setup()
        assert_eq!(sale.sale_date, day(2, 1));

        let stored = engine.database().rx_sales().get(sale.id).await.unwrap();
        assert_eq!(stored, Some(sale));

        // RX sales never touch stock
        assert_eq!(engine.database().ledger().count().await.unwrap(), 0);
        assert_eq!(engine.database().frames().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_rx_sale_unknown_brand() {
        let (engine, _) = setup().await;

        let err = engine
            .record_rx_sale(RxSaleIntent {
                brand_id: 9999,
                ..rx("GG0010", 42000)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Core(CoreError::BrandNotFound(9999))));
        assert_eq!(engine.database().rx_sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_rx_sale_rejects_zero_price() {
        let (engine, _) = setup().await;

        let err = engine.record_rx_sale(rx("GG0010", 0)).await.unwrap_err();

        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn test_list_newest_first_paged() {
        let (engine, _) = setup().await;
        for (i, d) in [3, 1, 2].into_iter().enumerate() {
            engine
                .record_rx_sale(RxSaleIntent {
                    sale_date: Some(day(3, d)),
                    cost_price: Some(Money::from_cents(1000 * i as i64)),
                    ..rx(&format!("RX{d}"), 30000)
                })
                .await
                .unwrap();
        }

        let repo = engine.database().rx_sales();
        let first = repo.list(1, 2).await.unwrap();
        let styles: Vec<_> = first.rx_sales.iter().map(|s| s.style_number.as_str()).collect();
        assert_eq!(styles, vec!["RX3", "RX2"]);
        assert_eq!(first.pagination.total_count, 3);
        assert_eq!(first.pagination.total_pages, 2);

        let second = repo.list(2, 2).await.unwrap();
        assert_eq!(second.rx_sales.len(), 1);
        assert_eq!(second.rx_sales[0].style_number, "RX1");
        assert_eq!(second.rx_sales[0].cost_price_cents, 1000);

        assert!(repo.list(3, 2).await.unwrap().rx_sales.is_empty());
    }
}
