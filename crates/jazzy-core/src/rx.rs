//! # RX Sales
//!
//! Prescription frames sold to order. They never pass through stock, so an
//! RX sale is a standalone record: no ledger entry, no FIFO draw, no status
//! change. Reports merge them with inventory sales.
//!
//! ```text
//!   RxSaleIntent ──► plan_rx_sale ──► NewRxSale ──► rx_sales ──► RxSale
//!        │                 │
//!        │                 └─ defaults: Unisex, Zyl, Optical, cost $0, now
//!        └─ brand must exist (checked by the store)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::identity::FrameIdentity;
use crate::money::Money;
use crate::types::Gender;
use crate::validation;

/// Frame type assumed when an RX sale does not state one.
pub const DEFAULT_RX_FRAME_TYPE: &str = "Zyl";

/// Product type assumed when an RX sale does not state one.
pub const DEFAULT_RX_PRODUCT_TYPE: &str = "Optical";

/// Largest page an RX listing returns.
pub const MAX_RX_PAGE_SIZE: u32 = 100;

/// Page size when the caller does not ask for one.
pub const DEFAULT_RX_PAGE_SIZE: u32 = 20;

// =============================================================================
// Records
// =============================================================================

/// A recorded RX sale, joined with its brand name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RxSale {
    pub id: i64,
    pub brand_id: i64,
    pub brand_name: String,
    pub style_number: String,
    pub color_code: String,
    pub eye_size: String,
    pub gender: Gender,
    pub frame_type: String,
    pub product_type: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub sale_price_cents: i64,
    /// Zero when the lab cost was not known at the counter.
    pub cost_price_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl RxSale {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }
}

/// A validated RX sale ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRxSale {
    pub brand_id: i64,
    pub style_number: String,
    pub color_code: String,
    pub eye_size: String,
    pub gender: Gender,
    pub frame_type: String,
    pub product_type: String,
    pub sale_date: DateTime<Utc>,
    pub sale_price_cents: i64,
    pub cost_price_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RxSaleIntent {
    pub brand_id: i64,
    pub style_number: String,
    pub color_code: String,
    pub eye_size: String,
    #[serde(default)]
    pub gender: Gender,
    pub frame_type: Option<String>,
    pub product_type: Option<String>,
    /// Defaults to now.
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    pub sale_price: Money,
    /// Defaults to $0.
    pub cost_price: Option<Money>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: i64,
    pub total_pages: i64,
}

impl Pagination {
    /// Clamps `page` to 1.. and `limit` to 1..=[`MAX_RX_PAGE_SIZE`].
    pub fn new(page: u32, limit: u32, total_count: i64) -> Self {
        let limit = limit.clamp(1, MAX_RX_PAGE_SIZE);
        let total_pages = (total_count + i64::from(limit) - 1) / i64::from(limit);
        Pagination {
            page: page.max(1),
            limit,
            total_count,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

/// One page of RX sales, newest first.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RxSalePage {
    pub rx_sales: Vec<RxSale>,
    pub pagination: Pagination,
}

// =============================================================================
// Planning
// =============================================================================

/// Validates an RX sale and fills in its defaults.
///
/// Whether the brand exists is left to the store.
pub fn plan_rx_sale(intent: &RxSaleIntent, now: DateTime<Utc>) -> CoreResult<NewRxSale> {
    let identity = FrameIdentity::new(
        intent.brand_id,
        &intent.style_number,
        &intent.color_code,
        &intent.eye_size,
    );
    identity.validate()?;

    let frame_type = intent
        .frame_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_RX_FRAME_TYPE);
    let product_type = intent
        .product_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_RX_PRODUCT_TYPE);
    validation::validate_frame_type(frame_type)?;
    validation::validate_product_type(product_type)?;

    validation::validate_sale_price(intent.sale_price.cents())?;
    let cost_price = intent.cost_price.unwrap_or_else(Money::zero);
    validation::validate_unit_cost(cost_price.cents())?;
    let notes = validation::validate_notes(intent.notes.as_deref())?;

    Ok(NewRxSale {
        brand_id: identity.brand_id,
        style_number: identity.style_number,
        color_code: identity.color_code,
        eye_size: identity.eye_size,
        gender: intent.gender,
        frame_type: frame_type.to_string(),
        product_type: product_type.to_string(),
        sale_date: intent.sale_date.unwrap_or(now),
        sale_price_cents: intent.sale_price.cents(),
        cost_price_cents: cost_price.cents(),
        notes,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};
    use chrono::TimeZone;

    fn intent() -> RxSaleIntent {
        RxSaleIntent {
            brand_id: 1001,
            style_number: " GG0010 ".to_string(),
            color_code: "BLK".to_string(),
            eye_size: "52".to_string(),
            gender: Gender::default(),
            frame_type: None,
            product_type: None,
            sale_date: None,
            sale_price: Money::from_cents(42000),
            cost_price: None,
            notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let sale = plan_rx_sale(&intent(), now).unwrap();

        assert_eq!(sale.style_number, "GG0010");
        assert_eq!(sale.gender, Gender::Unisex);
        assert_eq!(sale.frame_type, "Zyl");
        assert_eq!(sale.product_type, "Optical");
        assert_eq!(sale.sale_date, now);
        assert_eq!(sale.cost_price_cents, 0);
        assert_eq!(sale.notes, None);
    }

    #[test]
    fn test_stated_fields_kept() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        let sold = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let sale = plan_rx_sale(
            &RxSaleIntent {
                gender: Gender::Women,
                frame_type: Some("Metal".to_string()),
                product_type: Some("Sunglasses".to_string()),
                sale_date: Some(sold),
                cost_price: Some(Money::from_cents(15000)),
                ..intent()
            },
            now,
        )
        .unwrap();

        assert_eq!(sale.frame_type, "Metal");
        assert_eq!(sale.product_type, "Sunglasses");
        assert_eq!(sale.sale_date, sold);
        assert_eq!(sale.created_at, now);
        assert_eq!(sale.cost_price_cents, 15000);
    }

    #[test]
    fn test_rejects_free_sale_and_bad_type() {
        let now = Utc::now();
        let free = RxSaleIntent {
            sale_price: Money::zero(),
            ..intent()
        };
        assert!(matches!(
            plan_rx_sale(&free, now),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let odd = RxSaleIntent {
            frame_type: Some("Wood".to_string()),
            ..intent()
        };
        assert!(matches!(
            plan_rx_sale(&odd, now),
            Err(CoreError::Validation(ValidationError::NotAllowed { .. }))
        ));
    }

    #[test]
    fn test_pagination() {
        let p = Pagination::new(0, 500, 45);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 100);
        assert_eq!(p.total_pages, 1);

        let p = Pagination::new(3, 20, 45);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset(), 40);

        assert_eq!(Pagination::new(1, 20, 0).total_pages, 0);
    }
}
