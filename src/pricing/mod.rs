//! Pricing Engine.
//!
//! This module contains the pure billing rules: line-item discounts,
//! encounter total aggregation (including the admin fee and the doctor's
//! percentage), and reconciliation of doctor fees against agreed sitting fees.

mod doctor_fee;
mod encounter_totals;
mod line_discount;

pub use doctor_fee::{encounter_doctor_fee, payable_fee, reconcile_doctor_fees};
pub use encounter_totals::{aggregate_encounter_totals, encounter_totals, validate_encounter};
pub use line_discount::{LineDiscountResult, calculate_line_discount, price_line_item};
