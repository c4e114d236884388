//! Voucher engine.
//!
//! Pure rules for checking, discounting and redeeming vouchers. Storage and
//! concurrency live in [`crate::service::VoucherService`]; everything here
//! takes the current vouchers and usage records as plain slices.
//!
//! Evaluation order for a check:
//! 1. Code lookup (case-insensitive, active only)
//! 2. Expiry (the expiry date itself is still valid)
//! 3. Usage limit (counted from usage records)
//! 4. Minimum spend (treatment amount only, admin fee excluded)
//! 5. Discount on the treatment amount, admin fee added back in full

pub mod discount;
pub mod redemption;
pub mod stats;
pub mod status;
pub mod validation;

pub use discount::{DiscountBreakdown, build_breakdown, compute_voucher_discount};
pub use redemption::{RedemptionRecord, RedemptionRequest, record_redemption};
pub use stats::{VoucherStats, compute_voucher_stats};
pub use status::{AssignmentReminder, VoucherStatusReport, assignment_reminder, compute_voucher_status};
pub use validation::{
    RejectionReason, ValidationOutcome, ValidationRequest, ValidationResult, find_active_voucher,
    validate_voucher,
};
