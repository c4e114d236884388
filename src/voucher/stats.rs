//! Aggregate voucher statistics.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Voucher, VoucherStatus, VoucherUsageRecord};
use crate::money::round_currency;

use super::status::compute_voucher_status;

/// Counts and totals across all vouchers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherStats {
    /// Number of vouchers.
    pub total_vouchers: u32,
    /// Vouchers whose status is active.
    pub active_vouchers: u32,
    /// Vouchers redeemed at least once.
    pub used_vouchers: u32,
    /// Vouchers expired without redemption.
    pub expired_vouchers: u32,
    /// Vouchers whose usage limit was reached without redemption.
    pub used_up_vouchers: u32,
    /// Deactivated vouchers.
    pub inactive_vouchers: u32,
    /// Number of usage records.
    pub total_redemptions: u32,
    /// Sum of all discounts granted.
    pub total_discount_given: Decimal,
    /// Mean discount per redemption; zero with no redemptions.
    pub average_discount: Decimal,
}

/// Computes statistics over a set of vouchers and their usage records.
pub fn compute_voucher_stats(
    vouchers: &[Voucher],
    usages: &[VoucherUsageRecord],
    today: NaiveDate,
) -> VoucherStats {
    let mut stats = VoucherStats {
        total_vouchers: vouchers.len() as u32,
        ..VoucherStats::default()
    };

    for voucher in vouchers {
        match compute_voucher_status(voucher, usages, today).status {
            VoucherStatus::Active => stats.active_vouchers += 1,
            VoucherStatus::Used => stats.used_vouchers += 1,
            VoucherStatus::Expired => stats.expired_vouchers += 1,
            VoucherStatus::UsedUp => stats.used_up_vouchers += 1,
            VoucherStatus::Inactive => stats.inactive_vouchers += 1,
        }
    }

    stats.total_redemptions = usages.len() as u32;
    stats.total_discount_given = usages.iter().map(|u| u.discount_amount).sum();
    if stats.total_redemptions > 0 {
        stats.average_discount =
            round_currency(stats.total_discount_given / Decimal::from(stats.total_redemptions));
    }

    stats
}
