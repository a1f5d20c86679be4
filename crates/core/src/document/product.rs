//! Product master data as seen by the posting engine.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use stockledger_shared::types::ProductId;

use super::error::DocumentError;

/// Days counted per warranty month.
pub const DAYS_PER_WARRANTY_MONTH: u64 = 30;

/// Longest warranty a product may grant, in months.
pub const MAX_WARRANTY_MONTHS: u32 = 1200;

/// A stocked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier.
    pub id: ProductId,
    /// Stock keeping unit code.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Whether every unit carries its own serial number.
    pub track_sn: bool,
    /// Warranty length granted on sale, in 30-day months.
    pub warranty_months: Option<u32>,
    /// Whether the product is active.
    pub is_active: bool,
}

impl Product {
    /// Creates an active product that is not serial-tracked.
    #[must_use]
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProductId::new(),
            sku: sku.into(),
            name: name.into(),
            track_sn: false,
            warranty_months: None,
            is_active: true,
        }
    }

    /// Turns on serial tracking with an optional warranty.
    #[must_use]
    pub fn serialized(mut self, warranty_months: Option<u32>) -> Self {
        self.track_sn = true;
        self.warranty_months = warranty_months;
        self
    }

    /// Rejects master data the posting engine cannot use.
    pub fn validate(&self) -> Result<(), DocumentError> {
        match self.warranty_months {
            Some(months) if months > MAX_WARRANTY_MONTHS => {
                Err(DocumentError::WarrantyTooLong(months))
            }
            _ => Ok(()),
        }
    }

    /// Whether a sale of this product stamps a warranty end.
    #[must_use]
    pub fn grants_warranty(&self) -> bool {
        self.warranty_months.is_some_and(|months| months > 0)
    }

    /// Computes the warranty end for a unit sold on `start`.
    ///
    /// Returns `None` when the product grants no warranty, or when the end
    /// falls outside the calendar range.
    #[must_use]
    pub fn warranty_end(&self, start: NaiveDate) -> Option<NaiveDate> {
        let months = self.warranty_months.filter(|m| *m > 0)?;
        start.checked_add_days(Days::new(DAYS_PER_WARRANTY_MONTH * u64::from(months)))
    }
}
