//! Voucher discount computation.
//!
//! A voucher discounts the treatment portion of a bill only. The admin fee is
//! always charged in full and is never part of the base the discount is
//! taken from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{DiscountType, Voucher};
use crate::money::{clamp_percentage, non_negative, percent_of};

/// How a voucher changes a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountBreakdown {
    /// Treatment amount before the voucher.
    pub original_treatment_amount: Decimal,
    /// Discount granted.
    pub discount_amount: Decimal,
    /// `original_treatment_amount − discount_amount`.
    pub discounted_treatment_amount: Decimal,
    /// Admin fee, charged in full.
    pub admin_fee: Decimal,
    /// `discounted_treatment_amount + admin_fee`.
    pub final_total_amount: Decimal,
}

/// Computes the discount a voucher grants on a treatment amount.
///
/// - Percentage: `treatment × value / 100`, capped at `max_discount` if set.
/// - Fixed: `value`.
///
/// Either way the result is clamped to `[0, treatment_amount]`.
///
/// # Examples
///
/// ```
/// use clinic_billing::models::{DiscountType, Voucher};
/// use clinic_billing::voucher::compute_voucher_discount;
/// use chrono::Utc;
/// use rust_decimal::Decimal;
///
/// let voucher = Voucher {
///     id: "v-1".to_string(),
///     code: "SMILE20".to_string(),
///     description: String::new(),
///     is_active: true,
///     discount_type: DiscountType::Percentage,
///     discount_value: Decimal::new(20, 0),
///     max_discount: Some(Decimal::new(50_000, 0)),
///     min_amount: None,
///     min_purchase: None,
///     expiry_date: None,
///     usage_limit: None,
///     current_usage: 0,
///     created_at: Utc::now(),
/// };
///
/// let discount = compute_voucher_discount(&voucher, Decimal::new(1_000_000, 0));
/// assert_eq!(discount, Decimal::new(50_000, 0));
/// ```
pub fn compute_voucher_discount(voucher: &Voucher, treatment_amount: Decimal) -> Decimal {
    let treatment_amount = non_negative(treatment_amount);

    let raw = match voucher.discount_type {
        DiscountType::Percentage => {
            let discount = percent_of(treatment_amount, clamp_percentage(voucher.discount_value));
            match voucher.max_discount {
                Some(cap) => discount.min(non_negative(cap)),
                None => discount,
            }
        }
        DiscountType::Fixed => non_negative(voucher.discount_value),
    };

    raw.min(treatment_amount)
}

/// Builds the full bill breakdown for a voucher.
pub fn build_breakdown(
    voucher: &Voucher,
    treatment_amount: Decimal,
    admin_fee: Decimal,
) -> DiscountBreakdown {
    let original_treatment_amount = non_negative(treatment_amount);
    let admin_fee = non_negative(admin_fee);
    let discount_amount = compute_voucher_discount(voucher, original_treatment_amount);
    let discounted_treatment_amount = original_treatment_amount - discount_amount;

    DiscountBreakdown {
        original_treatment_amount,
        discount_amount,
        discounted_treatment_amount,
        admin_fee,
        final_total_amount: discounted_treatment_amount.saturating_add(admin_fee),
    }
}
