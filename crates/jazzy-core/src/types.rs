//! # Domain Types
//!
//! Records shared by the ledger engine, the store and the admin dashboard.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐   │
//! │  │     Frame       │   │    LedgerEntry      │   │  FrameStatus    │   │
//! │  │  ─────────────  │   │  ─────────────────  │   │  ─────────────  │   │
//! │  │  composite_id   │◄──│  frame_id (FK)      │   │  id             │   │
//! │  │  brand_id       │   │  transaction_type   │   │  name (unique)  │   │
//! │  │  status_id ─────┼──►│  quantity           │   │  is_protected   │   │
//! │  │  current_qty    │   │  remaining_qty      │   │  color_scheme   │   │
//! │  └─────────────────┘   │  reverted_from_id   │   └─────────────────┘   │
//! │                        └─────────────────────┘                          │
//! │  ┌─────────────────┐   ┌─────────────────────┐                          │
//! │  │    Company      │◄──│       Brand         │                          │
//! │  └─────────────────┘   └─────────────────────┘                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Composite Identity
//! A frame's key is `{brandId}-{styleNumber}-{colorCode}-{eyeSize}` (see
//! [`crate::identity`]). Ledger entries use an autoincrement id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Transaction Type
// =============================================================================

/// The kind of movement a ledger entry records.
///
/// ```text
///   inbound (+qty, opens a batch)      outbound (-qty, drains batches)
///   ─────────────────────────────      ───────────────────────────────
///   ORDER             intake           SALE
///   RESTOCK           re-order         WRITE_OFF
///   REVERT_WRITE_OFF  restore
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum TransactionType {
    Order,
    Restock,
    Sale,
    WriteOff,
    RevertWriteOff,
}

impl TransactionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Order => "ORDER",
            TransactionType::Restock => "RESTOCK",
            TransactionType::Sale => "SALE",
            TransactionType::WriteOff => "WRITE_OFF",
            TransactionType::RevertWriteOff => "REVERT_WRITE_OFF",
        }
    }

    /// Inbound entries carry `remaining_qty` and are consumed by FIFO draws.
    #[inline]
    pub const fn is_batch(&self) -> bool {
        matches!(
            self,
            TransactionType::Order | TransactionType::Restock | TransactionType::RevertWriteOff
        )
    }

    /// Effect of one unit of this entry on the product's quantity.
    #[inline]
    pub const fn quantity_sign(&self) -> i64 {
        if self.is_batch() {
            1
        } else {
            -1
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Write-off Reason
// =============================================================================

/// Why stock was written off.
///
/// Customer returns are inbound stock and are recorded as a restock, so
/// `"return"` is rejected when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum WriteOffReason {
    Damaged,
    Lost,
    Defective,
    Other,
}

impl WriteOffReason {
    pub const ALL: [WriteOffReason; 4] = [
        WriteOffReason::Damaged,
        WriteOffReason::Lost,
        WriteOffReason::Defective,
        WriteOffReason::Other,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            WriteOffReason::Damaged => "damaged",
            WriteOffReason::Lost => "lost",
            WriteOffReason::Defective => "defective",
            WriteOffReason::Other => "other",
        }
    }
}

impl FromStr for WriteOffReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "damaged" => Ok(WriteOffReason::Damaged),
            "lost" => Ok(WriteOffReason::Lost),
            "defective" => Ok(WriteOffReason::Defective),
            "other" => Ok(WriteOffReason::Other),
            "return" => Err(ValidationError::InvalidFormat {
                field: "reason".to_string(),
                reason: "customer returns are inbound stock; record a restock instead"
                    .to_string(),
            }),
            "" => Err(ValidationError::Required {
                field: "reason".to_string(),
            }),
            _ => Err(ValidationError::NotAllowed {
                field: "reason".to_string(),
                allowed: WriteOffReason::ALL
                    .iter()
                    .map(|r| r.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

impl fmt::Display for WriteOffReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Gender
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum Gender {
    Men,
    Women,
    #[default]
    Unisex,
}

impl FromStr for Gender {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Men" => Ok(Gender::Men),
            "Women" => Ok(Gender::Women),
            "Unisex" => Ok(Gender::Unisex),
            _ => Err(ValidationError::NotAllowed {
                field: "gender".to_string(),
                allowed: vec!["Men".into(), "Women".into(), "Unisex".into()],
            }),
        }
    }
}

// =============================================================================
// Color Scheme
// =============================================================================

/// Display color of a status badge on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ColorScheme {
    Green,
    Blue,
    Gray,
    Red,
    Yellow,
    Purple,
    Orange,
    Pink,
}

// =============================================================================
// Frame (Product)
// =============================================================================

/// A stock-keeping unit: one style/color/size of one brand.
///
/// `current_qty` is a cache of the ledger; it only changes in the same unit
/// of work that appends the entry explaining the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Frame {
    /// `{brandId}-{styleNumber}-{colorCode}-{eyeSize}`
    pub composite_id: String,
    pub brand_id: i64,
    pub status_id: i64,
    pub style_number: String,
    pub color_code: String,
    pub eye_size: String,
    pub gender: Gender,
    /// e.g. "Zyl", "Metal", "Rimless"
    pub frame_type: String,
    /// e.g. "Optical", "Sun"
    pub product_type: String,
    pub current_qty: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A frame as listed on the manage page: joined with brand and status, and
/// priced from its latest ORDER entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FrameListing {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    #[ts(flatten)]
    pub frame: Frame,
    pub brand_name: String,
    pub status_name: String,
    pub cost_price_cents: i64,
    pub retail_price_cents: i64,
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// One append-only movement against a frame.
///
/// Only `remaining_qty` ever changes after insert, and only downward, as
/// FIFO draws consume the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerEntry {
    pub id: i64,
    pub frame_id: String,
    pub transaction_type: TransactionType,
    /// Event date; backdated to the supplier invoice for ORDER/RESTOCK.
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub invoice_date: Option<DateTime<Utc>>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub unit_price_cents: i64,
    /// Set on batches only; zero means exhausted.
    pub remaining_qty: Option<i64>,
    pub write_off_reason: Option<WriteOffReason>,
    /// Set on REVERT_WRITE_OFF only; unique across the ledger.
    pub reverted_from_id: Option<i64>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Units still available for FIFO draws (0 for non-batches).
    #[inline]
    pub fn open_qty(&self) -> i64 {
        if self.transaction_type.is_batch() {
            self.remaining_qty.unwrap_or(0).max(0)
        } else {
            0
        }
    }

    /// Signed effect of this entry on the frame's quantity.
    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        self.quantity * self.transaction_type.quantity_sign()
    }
}

/// A ledger entry staged for insert (the store assigns the id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLedgerEntry {
    pub frame_id: String,
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub unit_price_cents: i64,
    pub remaining_qty: Option<i64>,
    pub write_off_reason: Option<WriteOffReason>,
    pub reverted_from_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// Materializes the staged entry once the store has assigned an id.
    pub fn with_id(self, id: i64) -> LedgerEntry {
        LedgerEntry {
            id,
            frame_id: self.frame_id,
            transaction_type: self.transaction_type,
            transaction_date: self.transaction_date,
            invoice_date: self.invoice_date,
            quantity: self.quantity,
            unit_cost_cents: self.unit_cost_cents,
            unit_price_cents: self.unit_price_cents,
            remaining_qty: self.remaining_qty,
            write_off_reason: self.write_off_reason,
            reverted_from_id: self.reverted_from_id,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}

/// A ledger entry as shown in a frame's transaction history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LedgerHistoryEntry {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    #[ts(flatten)]
    pub entry: LedgerEntry,
    /// Id of the REVERT_WRITE_OFF undoing this write-off, if any.
    pub reverted_by_id: Option<i64>,
}

impl LedgerHistoryEntry {
    /// Only meaningful for WRITE_OFF entries.
    pub fn is_reverted(&self) -> bool {
        self.reverted_by_id.is_some()
    }
}

/// A row of the write-off register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WriteOffRecord {
    pub id: i64,
    pub frame_id: String,
    pub brand_name: String,
    pub style_number: String,
    pub color_code: String,
    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    pub reason: Option<WriteOffReason>,
    pub notes: Option<String>,
    pub reverted_by_id: Option<i64>,
}

// =============================================================================
// Frame Status
// =============================================================================

/// A lifecycle label. Protected statuses are assigned by the engine only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FrameStatus {
    pub id: i64,
    pub name: String,
    pub color_scheme: ColorScheme,
    pub is_protected: bool,
    pub display_order: i64,
}

/// A status with the number of frames currently carrying it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FrameStatusSummary {
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    #[serde(flatten)]
    #[ts(flatten)]
    pub status: FrameStatus,
    pub product_count: i64,
}

/// Changes to a status definition; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusUpdate {
    pub name: Option<String>,
    pub color_scheme: Option<ColorScheme>,
    pub display_order: Option<i64>,
}

// =============================================================================
// Brand / Company
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Company {
    pub id: i64,
    pub company_name: String,
}

/// A brand; its id is chosen by the business and is part of frame ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Brand {
    pub id: i64,
    pub brand_name: String,
    pub company_id: i64,
    pub company_name: String,
    /// Units allocated to this brand per buying cycle.
    pub allocation_quantity: i64,
    pub product_count: i64,
}

/// A brand to register under a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewBrand {
    pub id: i64,
    pub brand_name: String,
    pub company_id: i64,
    #[serde(default)]
    pub allocation_quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BrandUpdate {
    pub brand_name: Option<String>,
    pub company_id: Option<i64>,
    pub allocation_quantity: Option<i64>,
}

/// Brands grouped under their company.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CompanyGroup {
    pub company_id: i64,
    pub company_name: String,
    pub brands: Vec<Brand>,
    pub total_brands: usize,
    pub total_allocation: i64,
}

impl CompanyGroup {
    /// Groups brands by company, preserving the order brands arrive in.
    pub fn group(companies: Vec<Company>, brands: Vec<Brand>) -> Vec<CompanyGroup> {
        companies
            .into_iter()
            .map(|company| {
                let brands: Vec<Brand> = brands
                    .iter()
                    .filter(|b| b.company_id == company.id)
                    .cloned()
                    .collect();
                CompanyGroup {
                    company_id: company.id,
                    company_name: company.company_name,
                    total_brands: brands.len(),
                    total_allocation: brands.iter().map(|b| b.allocation_quantity).sum(),
                    brands,
                }
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_direction() {
        assert!(TransactionType::Order.is_batch());
        assert!(TransactionType::Restock.is_batch());
        assert!(TransactionType::RevertWriteOff.is_batch());
        assert!(!TransactionType::Sale.is_batch());
        assert!(!TransactionType::WriteOff.is_batch());

        assert_eq!(TransactionType::Restock.quantity_sign(), 1);
        assert_eq!(TransactionType::WriteOff.quantity_sign(), -1);
    }

    #[test]
    fn test_transaction_type_serializes_screaming() {
        let json = serde_json::to_string(&TransactionType::RevertWriteOff).unwrap();
        assert_eq!(json, "\"REVERT_WRITE_OFF\"");
        assert_eq!(TransactionType::WriteOff.to_string(), "WRITE_OFF");
    }

    #[test]
    fn test_write_off_reason_parse() {
        assert_eq!("damaged".parse::<WriteOffReason>().unwrap(), WriteOffReason::Damaged);
        assert_eq!(" Lost ".parse::<WriteOffReason>().unwrap(), WriteOffReason::Lost);
        assert!(matches!(
            "".parse::<WriteOffReason>(),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            "stolen".parse::<WriteOffReason>(),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_return_is_not_a_write_off_reason() {
        let err = "return".parse::<WriteOffReason>().unwrap_err();
        assert!(err.to_string().contains("restock"));
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("Women".parse::<Gender>().unwrap(), Gender::Women);
        assert!("women".parse::<Gender>().is_err());
        assert_eq!(Gender::default(), Gender::Unisex);
    }

    #[test]
    fn test_company_group_totals() {
        let companies = vec![
            Company { id: 1, company_name: "Kering".into() },
            Company { id: 2, company_name: "Marcolin".into() },
        ];
        let brand = |id, company_id: i64, alloc| Brand {
            id,
            brand_name: format!("Brand {id}"),
            company_id,
            company_name: String::new(),
            allocation_quantity: alloc,
            product_count: 0,
        };
        let groups = CompanyGroup::group(
            companies,
            vec![brand(1001, 1, 10), brand(1002, 1, 5), brand(3001, 2, 8)],
        );

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].total_brands, 2);
        assert_eq!(groups[0].total_allocation, 15);
        assert_eq!(groups[1].brands[0].id, 3001);
    }
}
