//! Voucher eligibility checks.
//!
//! Validation is a read-only preview: it never mutates anything and returns
//! the same verdict for the same inputs until a redemption is recorded.
//! An invalid code is an expected outcome, so rejections are returned as
//! data rather than errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AuditStep, Voucher, VoucherUsageRecord};
use crate::money::{format_amount, non_negative};

use super::discount::{DiscountBreakdown, build_breakdown};

/// Why a voucher cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// No voucher has this code, or it has been deactivated.
    #[error("Voucher code '{code}' was not found or is no longer active")]
    NotFound {
        /// The normalised code that was looked up.
        code: String,
    },

    /// The voucher's expiry date has passed.
    #[error("Voucher expired on {expiry_date}")]
    Expired {
        /// The last redeemable day.
        expiry_date: NaiveDate,
    },

    /// The voucher has been redeemed as many times as allowed.
    #[error("Voucher usage limit of {usage_limit} has been reached")]
    UsageLimitReached {
        /// The configured limit.
        usage_limit: u32,
        /// Redemptions recorded so far.
        usage_count: u32,
    },

    /// The treatment amount is below the voucher's minimum spend.
    #[error(
        "Minimum treatment amount of {} (excluding admin fee) not met; treatment amount is {}",
        format_amount(*threshold),
        format_amount(*treatment_amount)
    )]
    BelowMinimum {
        /// The minimum treatment amount.
        threshold: Decimal,
        /// The treatment amount offered.
        treatment_amount: Decimal,
    },
}

impl RejectionReason {
    /// A stable machine-readable code for the rejection.
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::NotFound { .. } => "VOUCHER_NOT_FOUND",
            RejectionReason::Expired { .. } => "VOUCHER_EXPIRED",
            RejectionReason::UsageLimitReached { .. } => "VOUCHER_USAGE_LIMIT_REACHED",
            RejectionReason::BelowMinimum { .. } => "VOUCHER_BELOW_MINIMUM",
        }
    }
}

/// A request to check a voucher against a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRequest {
    /// The code as typed; case and surrounding whitespace are ignored.
    pub code: String,
    /// Treatment amount the voucher would apply to.
    pub treatment_amount: Decimal,
    /// Admin fee on the same bill.
    #[serde(default)]
    pub admin_fee: Decimal,
    /// The patient the voucher is being applied for.
    #[serde(default)]
    pub patient_id: Option<String>,
}

/// The verdict of a voucher check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// The voucher can be applied.
    Valid {
        /// The matched voucher.
        voucher_id: String,
        /// The matched voucher's code.
        voucher_code: String,
        /// The resulting bill.
        breakdown: DiscountBreakdown,
    },
    /// The voucher cannot be applied.
    Rejected {
        /// Why not.
        reason: RejectionReason,
        /// The user-facing explanation.
        message: String,
    },
}

/// The result of a voucher check, including the audit step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// The verdict.
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    /// The audit step recording this check.
    pub audit_step: AuditStep,
}

impl ValidationResult {
    /// True if the voucher can be applied.
    pub fn is_valid(&self) -> bool {
        matches!(self.outcome, ValidationOutcome::Valid { .. })
    }

    /// The bill breakdown, if valid.
    pub fn breakdown(&self) -> Option<&DiscountBreakdown> {
        match &self.outcome {
            ValidationOutcome::Valid { breakdown, .. } => Some(breakdown),
            ValidationOutcome::Rejected { .. } => None,
        }
    }

    /// The rejection reason, if rejected.
    pub fn rejection(&self) -> Option<&RejectionReason> {
        match &self.outcome {
            ValidationOutcome::Valid { .. } => None,
            ValidationOutcome::Rejected { reason, .. } => Some(reason),
        }
    }
}

/// Finds an active voucher by code, ignoring case.
pub fn find_active_voucher<'a>(vouchers: &'a [Voucher], code: &str) -> Option<&'a Voucher> {
    let normalized = Voucher::normalize_code(code);
    vouchers
        .iter()
        .find(|v| v.is_active && Voucher::normalize_code(&v.code) == normalized)
}

/// Checks a voucher code against a bill.
///
/// Checks run in order and the first failure wins:
/// 1. the code must match an active voucher
/// 2. the voucher must not be past its expiry date
/// 3. recorded usages must be below the usage limit
/// 4. the treatment amount (admin fee excluded) must meet the minimum spend
///
/// On success the discount is computed on the treatment amount only.
///
/// # Arguments
///
/// * `request` - The code and bill amounts
/// * `vouchers` - Candidate vouchers to match the code against
/// * `usages` - Usage records; only those for the matched voucher are counted
/// * `today` - The date expiry is evaluated against
/// * `step_number` - The step number for audit trail sequencing
pub fn validate_voucher(
    request: &ValidationRequest,
    vouchers: &[Voucher],
    usages: &[VoucherUsageRecord],
    today: NaiveDate,
    step_number: u32,
) -> ValidationResult {
    let code = Voucher::normalize_code(&request.code);
    let treatment_amount = non_negative(request.treatment_amount);

    let input = serde_json::json!({
        "code": code,
        "treatment_amount": treatment_amount.to_string(),
        "admin_fee": request.admin_fee.to_string(),
        "patient_id": request.patient_id,
        "date": today.to_string()
    });

    let verdict = check_eligibility(&code, treatment_amount, vouchers, usages, today);

    let (outcome, output, reasoning) = match verdict {
        Ok(voucher) => {
            let breakdown = build_breakdown(voucher, treatment_amount, request.admin_fee);
            let output = serde_json::json!({
                "valid": true,
                "voucher_id": voucher.id,
                "discount_amount": breakdown.discount_amount.to_string(),
                "final_total_amount": breakdown.final_total_amount.to_string()
            });
            let reasoning = format!(
                "Voucher {} grants {} off treatment {}; admin fee {} charged in full",
                voucher.code,
                breakdown.discount_amount,
                breakdown.original_treatment_amount,
                breakdown.admin_fee
            );
            (
                ValidationOutcome::Valid {
                    voucher_id: voucher.id.clone(),
                    voucher_code: voucher.code.clone(),
                    breakdown,
                },
                output,
                reasoning,
            )
        }
        Err(reason) => {
            let message = reason.to_string();
            let output = serde_json::json!({
                "valid": false,
                "reason": reason.code()
            });
            (
                ValidationOutcome::Rejected {
                    reason,
                    message: message.clone(),
                },
                output,
                message,
            )
        }
    };

    ValidationResult {
        outcome,
        audit_step: AuditStep {
            step_number,
            rule_id: "voucher_validation".to_string(),
            rule_name: "Voucher Validation".to_string(),
            input,
            output,
            reasoning,
        },
    }
}

fn check_eligibility<'a>(
    code: &str,
    treatment_amount: Decimal,
    vouchers: &'a [Voucher],
    usages: &[VoucherUsageRecord],
    today: NaiveDate,
) -> Result<&'a Voucher, RejectionReason> {
    let voucher = find_active_voucher(vouchers, code).ok_or_else(|| RejectionReason::NotFound {
        code: code.to_string(),
    })?;

    if let Some(expiry_date) = voucher.expiry_date {
        if today > expiry_date {
            return Err(RejectionReason::Expired { expiry_date });
        }
    }

    if let Some(usage_limit) = voucher.usage_limit {
        let usage_count = usages.iter().filter(|u| u.voucher_id == voucher.id).count() as u32;
        if usage_count >= usage_limit {
            return Err(RejectionReason::UsageLimitReached {
                usage_limit,
                usage_count,
            });
        }
    }

    if let Some(threshold) = voucher.minimum_spend() {
        if treatment_amount < threshold {
            return Err(RejectionReason::BelowMinimum {
                threshold,
                treatment_amount,
            });
        }
    }

    Ok(voucher)
}
