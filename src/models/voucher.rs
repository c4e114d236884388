//! Voucher models.
//!
//! This module defines [`Voucher`], the append-only [`VoucherUsageRecord`]
//! log, optional [`VoucherAssignment`]s, and the derived [`VoucherStatus`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a voucher's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is a percentage of the treatment amount.
    Percentage,
    /// `discount_value` is an amount in currency units.
    Fixed,
}

/// A redeemable discount code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    /// Unique identifier of the voucher.
    pub id: String,
    /// Redemption code, stored uppercase.
    pub code: String,
    /// Free-text description for staff.
    #[serde(default)]
    pub description: String,
    /// Deactivated vouchers can never be redeemed.
    pub is_active: bool,
    /// How `discount_value` is interpreted.
    pub discount_type: DiscountType,
    /// Percentage or amount, depending on `discount_type`.
    pub discount_value: Decimal,
    /// Cap on a percentage discount.
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    /// Minimum treatment amount (admin fee excluded).
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    /// Minimum purchase (admin fee excluded); checked alongside `min_amount`.
    #[serde(default)]
    pub min_purchase: Option<Decimal>,
    /// Last day the voucher can be redeemed.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Cap on total redemptions.
    #[serde(default)]
    pub usage_limit: Option<u32>,
    /// Number of redemptions recorded so far.
    #[serde(default)]
    pub current_usage: u32,
    /// When the voucher was created.
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Normalises a code for storage and comparison.
    ///
    /// # Examples
    ///
    /// ```
    /// use clinic_billing::models::Voucher;
    ///
    /// assert_eq!(Voucher::normalize_code("  smile10 "), "SMILE10");
    /// ```
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    /// The strictest of `min_amount` and `min_purchase`, if either is set.
    pub fn minimum_spend(&self) -> Option<Decimal> {
        match (self.min_amount, self.min_purchase) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// True if the voucher has expired as of `today`.
    ///
    /// The expiry date itself is still redeemable.
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| today > expiry)
    }
}

/// What a redemption was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Dental treatment.
    Treatment,
    /// Consultation only.
    Consultation,
    /// Laboratory work.
    Lab,
}

/// One recorded redemption. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherUsageRecord {
    /// Unique identifier of the usage record.
    pub id: Uuid,
    /// The redeemed voucher.
    pub voucher_id: String,
    /// The code as stored on the voucher at redemption time.
    pub voucher_code: String,
    /// The patient the voucher was used for.
    pub patient_id: String,
    /// Treatment amount before the voucher.
    pub original_treatment_amount: Decimal,
    /// Discount granted by the voucher.
    pub discount_amount: Decimal,
    /// Treatment amount after the voucher.
    pub discounted_treatment_amount: Decimal,
    /// Admin fee charged in full.
    pub admin_fee: Decimal,
    /// What the patient paid: discounted treatment plus admin fee.
    pub final_total_amount: Decimal,
    /// When the redemption was committed.
    pub used_date: DateTime<Utc>,
    /// The operator who applied the voucher.
    pub used_by: String,
    /// What the redemption was applied to.
    pub transaction_type: TransactionType,
}

/// Links a voucher to the patient it was issued for.
///
/// Used only for reminders and status display; eligibility never checks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherAssignment {
    /// The assigned voucher.
    pub voucher_id: String,
    /// The intended recipient.
    pub patient_id: String,
    /// When the assignment was made.
    pub assigned_at: DateTime<Utc>,
    /// Optional note for front-desk staff.
    #[serde(default)]
    pub note: Option<String>,
}

/// Derived voucher status, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Explicitly deactivated.
    Inactive,
    /// Redeemed at least once.
    Used,
    /// Past its expiry date and never redeemed.
    Expired,
    /// Usage limit reached without any recorded redemption.
    UsedUp,
    /// Redeemable.
    Active,
}

impl VoucherStatus {
    /// The label shown to staff.
    pub fn status_text(&self) -> &'static str {
        match self {
            VoucherStatus::Inactive => "Inactive",
            VoucherStatus::Used => "Used",
            VoucherStatus::Expired => "Expired",
            VoucherStatus::UsedUp => "Usage limit reached",
            VoucherStatus::Active => "Active",
        }
    }
}
