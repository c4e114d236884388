//! Billable line items on a treatment encounter.
//!
//! This module defines the [`TreatmentLineItem`] and [`MedicationLineItem`]
//! types together with the [`DiscountMode`] a treatment discount is entered in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the discount on a treatment line was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountMode {
    /// `discount_input` is a percentage of the unit price (0–100).
    Percentage,
    /// `discount_input` is an amount in currency units (0–unit price).
    Fixed,
}

impl DiscountMode {
    /// Returns the wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountMode::Percentage => "percentage",
            DiscountMode::Fixed => "fixed",
        }
    }
}

/// One billable procedure on an encounter.
///
/// # Example
///
/// ```
/// use clinic_billing::models::{DiscountMode, TreatmentLineItem};
/// use rust_decimal::Decimal;
///
/// let item = TreatmentLineItem {
///     id: "tx-1".to_string(),
///     name: "Scaling".to_string(),
///     unit_price: Decimal::new(200_000, 0),
///     discount_mode: DiscountMode::Percentage,
///     discount_input: Decimal::new(10, 0),
/// };
/// assert_eq!(item.net_price(), Decimal::new(180_000, 0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentLineItem {
    /// Unique identifier of the line.
    pub id: String,
    /// Procedure name as shown on the bill.
    pub name: String,
    /// Undiscounted price in whole currency units.
    pub unit_price: Decimal,
    /// How `discount_input` is interpreted.
    #[serde(default = "default_discount_mode")]
    pub discount_mode: DiscountMode,
    /// The discount as entered by the clerk.
    #[serde(default)]
    pub discount_input: Decimal,
}

fn default_discount_mode() -> DiscountMode {
    DiscountMode::Percentage
}

impl TreatmentLineItem {
    /// Creates an undiscounted line item.
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_price,
            discount_mode: DiscountMode::Percentage,
            discount_input: Decimal::ZERO,
        }
    }

    /// Returns a copy of this item with the given discount applied.
    pub fn with_discount(mut self, mode: DiscountMode, input: Decimal) -> Self {
        self.discount_mode = mode;
        self.discount_input = input;
        self
    }

    /// The discount amount after clamping to the item's own price.
    pub fn discount_amount(&self) -> Decimal {
        crate::pricing::calculate_line_discount(
            self.unit_price,
            self.discount_input,
            self.discount_mode,
        )
    }

    /// The price after discount; never negative.
    pub fn net_price(&self) -> Decimal {
        crate::money::non_negative(self.unit_price) - self.discount_amount()
    }
}

/// One dispensed medication on an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationLineItem {
    /// Unique identifier of the line.
    pub id: String,
    /// Drug name as shown on the bill.
    pub name: String,
    /// Price per unit in whole currency units.
    pub unit_price: Decimal,
    /// Units dispensed; must be positive.
    pub quantity: u32,
}

impl MedicationLineItem {
    /// Returns `unit_price × quantity`, with negative prices floored at zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use clinic_billing::models::MedicationLineItem;
    /// use rust_decimal::Decimal;
    ///
    /// let med = MedicationLineItem {
    ///     id: "med-1".to_string(),
    ///     name: "Amoxicillin 500mg".to_string(),
    ///     unit_price: Decimal::new(5_000, 0),
    ///     quantity: 10,
    /// };
    /// assert_eq!(med.line_total(), Decimal::new(50_000, 0));
    /// ```
    pub fn line_total(&self) -> Decimal {
        crate::money::non_negative(self.unit_price).saturating_mul(Decimal::from(self.quantity))
    }
}
