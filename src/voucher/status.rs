//! Derived voucher status and assignment reminders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Voucher, VoucherAssignment, VoucherStatus, VoucherUsageRecord};

/// A voucher's derived status with the numbers behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherStatusReport {
    /// The voucher.
    pub voucher_id: String,
    /// The voucher's code.
    pub code: String,
    /// Derived status.
    pub status: VoucherStatus,
    /// The label shown to staff.
    pub status_text: String,
    /// Redemptions recorded for this voucher.
    pub usage_count: u32,
    /// Redemptions left before the limit, if limited.
    pub remaining_uses: Option<u32>,
}

fn usage_count(voucher: &Voucher, usages: &[VoucherUsageRecord]) -> u32 {
    let recorded = usages.iter().filter(|u| u.voucher_id == voucher.id).count() as u32;
    recorded.max(voucher.current_usage)
}

/// Derives a voucher's status.
///
/// Usage is the larger of the voucher's counter and its usage records.
///
/// Priority: inactive, then used (any recorded redemption), then expired,
/// then usage limit reached, else active. A used voucher stays "used" after
/// it expires.
pub fn compute_voucher_status(
    voucher: &Voucher,
    usages: &[VoucherUsageRecord],
    today: NaiveDate,
) -> VoucherStatusReport {
    let count = usage_count(voucher, usages);

    let status = if !voucher.is_active {
        VoucherStatus::Inactive
    } else if count > 0 {
        VoucherStatus::Used
    } else if voucher.is_expired_on(today) {
        VoucherStatus::Expired
    } else if voucher.usage_limit.is_some_and(|limit| count >= limit) {
        VoucherStatus::UsedUp
    } else {
        VoucherStatus::Active
    };

    VoucherStatusReport {
        voucher_id: voucher.id.clone(),
        code: voucher.code.clone(),
        status,
        status_text: status.status_text().to_string(),
        usage_count: count,
        remaining_uses: voucher.usage_limit.map(|limit| limit.saturating_sub(count)),
    }
}

/// A voucher waiting on a patient, for front-desk reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentReminder {
    /// The assignment.
    pub assignment: VoucherAssignment,
    /// The assigned voucher's status.
    pub status: VoucherStatusReport,
    /// True if the assigned patient has redeemed this voucher.
    pub redeemed_by_recipient: bool,
    /// Days left until expiry; negative once expired.
    pub days_until_expiry: Option<i64>,
}

impl AssignmentReminder {
    /// True if the reminder still calls for front-desk action.
    pub fn is_pending(&self) -> bool {
        !self.redeemed_by_recipient
            && matches!(self.status.status, VoucherStatus::Active | VoucherStatus::Used)
    }
}

/// Builds the reminder view of one assignment.
pub fn assignment_reminder(
    assignment: &VoucherAssignment,
    voucher: &Voucher,
    usages: &[VoucherUsageRecord],
    today: NaiveDate,
) -> AssignmentReminder {
    let redeemed_by_recipient = usages
        .iter()
        .any(|u| u.voucher_id == voucher.id && u.patient_id == assignment.patient_id);

    AssignmentReminder {
        assignment: assignment.clone(),
        status: compute_voucher_status(voucher, usages, today),
        redeemed_by_recipient,
        days_until_expiry: voucher
            .expiry_date
            .map(|expiry| (expiry - today).num_days()),
    }
}
