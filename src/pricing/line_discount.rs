//! Line-item discount calculation.
//!
//! A treatment line carries either a percentage or a fixed-amount discount.
//! Whatever the clerk enters, the resulting discount stays within
//! `[0, unit_price]` so no line can ever go negative.

use rust_decimal::Decimal;

use crate::models::{AuditStep, DiscountMode, TreatmentLineItem};
use crate::money::{clamp_percentage, non_negative, percent_of};

/// The result of pricing one treatment line, including the audit step.
#[derive(Debug, Clone)]
pub struct LineDiscountResult {
    /// The clamped discount amount.
    pub discount_amount: Decimal,
    /// `unit_price − discount_amount`.
    pub net_price: Decimal,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Computes the discount on one treatment line.
///
/// - Percentage: `unit_price × discount_input / 100`, with the input clamped
///   to 0–100 and the result rounded to whole currency units.
/// - Fixed: `min(discount_input, unit_price)`.
///
/// Negative prices and negative inputs are treated as zero.
///
/// # Examples
///
/// ```
/// use clinic_billing::models::DiscountMode;
/// use clinic_billing::pricing::calculate_line_discount;
/// use rust_decimal::Decimal;
///
/// let pct = calculate_line_discount(Decimal::new(200_000, 0), Decimal::new(10, 0), DiscountMode::Percentage);
/// assert_eq!(pct, Decimal::new(20_000, 0));
///
/// let fixed = calculate_line_discount(Decimal::new(50_000, 0), Decimal::new(70_000, 0), DiscountMode::Fixed);
/// assert_eq!(fixed, Decimal::new(50_000, 0));
/// ```
pub fn calculate_line_discount(
    unit_price: Decimal,
    discount_input: Decimal,
    discount_mode: DiscountMode,
) -> Decimal {
    let unit_price = non_negative(unit_price);
    let input = non_negative(discount_input);

    let raw = match discount_mode {
        DiscountMode::Percentage => percent_of(unit_price, clamp_percentage(input)),
        DiscountMode::Fixed => input,
    };

    raw.min(unit_price)
}

/// Prices a treatment line and records the decision.
pub fn price_line_item(item: &TreatmentLineItem, step_number: u32) -> LineDiscountResult {
    let discount_amount =
        calculate_line_discount(item.unit_price, item.discount_input, item.discount_mode);
    let net_price = non_negative(item.unit_price) - discount_amount;

    let clamped = match item.discount_mode {
        DiscountMode::Percentage => {
            item.discount_input < Decimal::ZERO || item.discount_input > Decimal::ONE_HUNDRED
        }
        DiscountMode::Fixed => {
            item.discount_input < Decimal::ZERO || item.discount_input > item.unit_price
        }
    };

    let reasoning = match item.discount_mode {
        DiscountMode::Percentage => format!(
            "{}: {}% of {} = {}",
            item.name,
            clamp_percentage(item.discount_input).normalize(),
            item.unit_price.normalize(),
            discount_amount
        ),
        DiscountMode::Fixed if clamped => format!(
            "{}: fixed discount {} clamped to {} so the line cannot go negative",
            item.name,
            item.discount_input.normalize(),
            discount_amount
        ),
        DiscountMode::Fixed => format!(
            "{}: fixed discount of {}",
            item.name,
            discount_amount
        ),
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "line_discount".to_string(),
        rule_name: "Line Item Discount".to_string(),
        input: serde_json::json!({
            "item_id": item.id,
            "unit_price": item.unit_price.normalize().to_string(),
            "discount_mode": item.discount_mode.as_str(),
            "discount_input": item.discount_input.normalize().to_string()
        }),
        output: serde_json::json!({
            "discount_amount": discount_amount.to_string(),
            "net_price": net_price.to_string(),
            "clamped": clamped
        }),
        reasoning,
    };

    LineDiscountResult {
        discount_amount,
        net_price,
        audit_step,
    }
}
