//! # Frame Identity
//!
//! A frame's key is derived from four identity fields:
//!
//! ```text
//!   brandId   styleNumber   colorCode   eyeSize
//!     1001  -   GG0002    -    TRT    -   54      ──►  "1001-GG0002-TRT-54"
//! ```
//!
//! Changing any of them changes the key. [`plan_rename`] decides whether an
//! edit is an in-place update of descriptive fields or a re-key, which the
//! store carries out as one unit of work:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. INSERT frame under the new id (qty, status, created_at copied)     │
//! │  2. UPDATE every ledger entry: frame_id = new id                       │
//! │  3. DELETE the frame row under the old id                              │
//! │                                                                         │
//! │  all three commit together or not at all                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::types::{Frame, Gender};
use crate::validation::{
    self, validate_brand_id, validate_color_code, validate_eye_size, validate_style_number,
    ValidationResult,
};

/// The four fields a composite id is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FrameIdentity {
    pub brand_id: i64,
    pub style_number: String,
    pub color_code: String,
    pub eye_size: String,
}

impl FrameIdentity {
    /// Builds an identity with surrounding whitespace trimmed.
    pub fn new(
        brand_id: i64,
        style_number: impl AsRef<str>,
        color_code: impl AsRef<str>,
        eye_size: impl AsRef<str>,
    ) -> Self {
        FrameIdentity {
            brand_id,
            style_number: style_number.as_ref().trim().to_string(),
            color_code: color_code.as_ref().trim().to_string(),
            eye_size: eye_size.as_ref().trim().to_string(),
        }
    }

    pub fn of(frame: &Frame) -> Self {
        FrameIdentity {
            brand_id: frame.brand_id,
            style_number: frame.style_number.clone(),
            color_code: frame.color_code.clone(),
            eye_size: frame.eye_size.clone(),
        }
    }

    /// `{brandId}-{styleNumber}-{colorCode}-{eyeSize}`
    pub fn composite_id(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.brand_id, self.style_number, self.color_code, self.eye_size
        )
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_brand_id(self.brand_id)?;
        validate_style_number(&self.style_number)?;
        validate_color_code(&self.color_code)?;
        validate_eye_size(&self.eye_size)?;
        Ok(())
    }
}

/// Requested changes to a frame's identity and descriptive fields.
///
/// `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IdentityUpdate {
    pub brand_id: Option<i64>,
    pub style_number: Option<String>,
    pub color_code: Option<String>,
    pub eye_size: Option<String>,
    pub gender: Option<Gender>,
    pub frame_type: Option<String>,
    pub product_type: Option<String>,
}

/// What a rename turns into once the new composite id is known.
#[derive(Debug, Clone, PartialEq)]
pub enum RenamePlan {
    /// The composite id is unchanged; only descriptive fields are written.
    InPlace { frame: Frame },
    /// The composite id changes; the store re-keys the frame and its ledger.
    Rekey { old_id: String, frame: Frame },
}

impl RenamePlan {
    pub fn frame(&self) -> &Frame {
        match self {
            RenamePlan::InPlace { frame } | RenamePlan::Rekey { frame, .. } => frame,
        }
    }

    pub fn is_rekey(&self) -> bool {
        matches!(self, RenamePlan::Rekey { .. })
    }
}

/// Applies `update` to `current` and classifies the result.
///
/// Quantity, status and creation time are carried over unchanged. Whether
/// the new id is free and the brand exists is checked by the store.
pub fn plan_rename(
    current: &Frame,
    update: &IdentityUpdate,
    now: DateTime<Utc>,
) -> CoreResult<RenamePlan> {
    let old = FrameIdentity::of(current);
    let identity = FrameIdentity::new(
        update.brand_id.unwrap_or(old.brand_id),
        update.style_number.as_deref().unwrap_or(&old.style_number),
        update.color_code.as_deref().unwrap_or(&old.color_code),
        update.eye_size.as_deref().unwrap_or(&old.eye_size),
    );
    identity.validate()?;

    if let Some(frame_type) = &update.frame_type {
        validation::validate_frame_type(frame_type)?;
    }
    if let Some(product_type) = &update.product_type {
        validation::validate_product_type(product_type)?;
    }

    let new_id = identity.composite_id();
    let frame = Frame {
        composite_id: new_id.clone(),
        brand_id: identity.brand_id,
        status_id: current.status_id,
        style_number: identity.style_number,
        color_code: identity.color_code,
        eye_size: identity.eye_size,
        gender: update.gender.unwrap_or(current.gender),
        frame_type: update
            .frame_type
            .clone()
            .unwrap_or_else(|| current.frame_type.clone()),
        product_type: update
            .product_type
            .clone()
            .unwrap_or_else(|| current.product_type.clone()),
        current_qty: current.current_qty,
        created_at: current.created_at,
        updated_at: now,
    };

    if new_id == current.composite_id {
        Ok(RenamePlan::InPlace { frame })
    } else {
        Ok(RenamePlan::Rekey {
            old_id: current.composite_id.clone(),
            frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use chrono::TimeZone;

    fn frame() -> Frame {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Frame {
            composite_id: "1001-GG0002-TRT-54".to_string(),
            brand_id: 1001,
            status_id: 1,
            style_number: "GG0002".to_string(),
            color_code: "TRT".to_string(),
            eye_size: "54".to_string(),
            gender: Gender::Women,
            frame_type: "Zyl".to_string(),
            product_type: "Optical".to_string(),
            current_qty: 3,
            created_at: created,
            updated_at: created,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_composite_id() {
        let identity = FrameIdentity::new(1001, " GG0002", "TRT ", "54");
        assert_eq!(identity.composite_id(), "1001-GG0002-TRT-54");
    }

    #[test]
    fn test_style_change_rekeys() {
        let update = IdentityUpdate {
            style_number: Some("GG0003".to_string()),
            ..Default::default()
        };

        let plan = plan_rename(&frame(), &update, now()).unwrap();

        let RenamePlan::Rekey { old_id, frame: renamed } = plan else {
            panic!("expected a re-key");
        };
        assert_eq!(old_id, "1001-GG0002-TRT-54");
        assert_eq!(renamed.composite_id, "1001-GG0003-TRT-54");
        assert_eq!(renamed.current_qty, 3);
        assert_eq!(renamed.status_id, 1);
        assert_eq!(renamed.created_at, frame().created_at);
        assert_eq!(renamed.updated_at, now());
    }

    #[test]
    fn test_descriptive_change_is_in_place() {
        let update = IdentityUpdate {
            gender: Some(Gender::Unisex),
            frame_type: Some("Metal".to_string()),
            ..Default::default()
        };

        let plan = plan_rename(&frame(), &update, now()).unwrap();

        assert!(!plan.is_rekey());
        assert_eq!(plan.frame().composite_id, "1001-GG0002-TRT-54");
        assert_eq!(plan.frame().gender, Gender::Unisex);
        assert_eq!(plan.frame().frame_type, "Metal");
    }

    #[test]
    fn test_rename_validates_fields() {
        let update = IdentityUpdate {
            color_code: Some("".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            plan_rename(&frame(), &update, now()),
            Err(CoreError::Validation(_))
        ));

        let update = IdentityUpdate {
            product_type: Some("Goggles".to_string()),
            ..Default::default()
        };
        assert!(plan_rename(&frame(), &update, now()).is_err());
    }
}
