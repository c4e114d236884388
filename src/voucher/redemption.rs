//! Building the records a redemption commits.
//!
//! This is the pure half of redemption: given a voucher that has just passed
//! validation, produce the usage record to append and the voucher with its
//! counter advanced. Committing both atomically is the service's job.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AuditStep, TransactionType, Voucher, VoucherUsageRecord};

use super::discount::DiscountBreakdown;

/// A request to redeem a voucher against a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionRequest {
    /// The patient the voucher is being used for.
    pub patient_id: String,
    /// Treatment amount the voucher applies to.
    pub treatment_amount: Decimal,
    /// Admin fee on the same bill.
    #[serde(default)]
    pub admin_fee: Decimal,
    /// The operator applying the voucher.
    pub used_by: String,
    /// What the voucher is applied to.
    #[serde(default = "default_transaction_type")]
    pub transaction_type: TransactionType,
}

fn default_transaction_type() -> TransactionType {
    TransactionType::Treatment
}

/// The records produced by one redemption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    /// The usage record to append.
    pub usage_record: VoucherUsageRecord,
    /// The voucher with `current_usage` incremented.
    pub updated_voucher: Voucher,
    /// The audit step recording the redemption.
    pub audit_step: AuditStep,
}

/// Builds the usage record and updated voucher for a validated redemption.
///
/// # Arguments
///
/// * `voucher` - The voucher as read inside the redemption attempt
/// * `breakdown` - The bill computed by validation
/// * `request` - Who redeemed it, for whom, and against what
/// * `usage_id` - Id for the new usage record, fixed across commit attempts
/// * `used_at` - The commit timestamp
/// * `step_number` - The step number for audit trail sequencing
pub fn record_redemption(
    voucher: &Voucher,
    breakdown: &DiscountBreakdown,
    request: &RedemptionRequest,
    usage_id: Uuid,
    used_at: DateTime<Utc>,
    step_number: u32,
) -> RedemptionRecord {
    let usage_record = VoucherUsageRecord {
        id: usage_id,
        voucher_id: voucher.id.clone(),
        voucher_code: voucher.code.clone(),
        patient_id: request.patient_id.clone(),
        original_treatment_amount: breakdown.original_treatment_amount,
        discount_amount: breakdown.discount_amount,
        discounted_treatment_amount: breakdown.discounted_treatment_amount,
        admin_fee: breakdown.admin_fee,
        final_total_amount: breakdown.final_total_amount,
        used_date: used_at,
        used_by: request.used_by.clone(),
        transaction_type: request.transaction_type,
    };

    let mut updated_voucher = voucher.clone();
    updated_voucher.current_usage = voucher.current_usage.saturating_add(1);

    let audit_step = AuditStep {
        step_number,
        rule_id: "voucher_redemption".to_string(),
        rule_name: "Voucher Redemption".to_string(),
        input: serde_json::json!({
            "voucher_id": voucher.id,
            "patient_id": request.patient_id,
            "used_by": request.used_by,
            "current_usage": voucher.current_usage
        }),
        output: serde_json::json!({
            "usage_id": usage_record.id,
            "discount_amount": breakdown.discount_amount.to_string(),
            "final_total_amount": breakdown.final_total_amount.to_string(),
            "current_usage": updated_voucher.current_usage
        }),
        reasoning: format!(
            "Redeemed {} for patient {}: {} off, patient pays {}",
            voucher.code, request.patient_id, breakdown.discount_amount, breakdown.final_total_amount
        ),
    };

    RedemptionRecord {
        usage_record,
        updated_voucher,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscountType;
    use crate::voucher::build_breakdown;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn voucher() -> Voucher {
        Voucher {
            id: "v-1".to_string(),
            code: "FIXED50".to_string(),
            description: String::new(),
            is_active: true,
            discount_type: DiscountType::Fixed,
            discount_value: dec("50000"),
            max_discount: None,
            min_amount: None,
            min_purchase: None,
            expiry_date: None,
            usage_limit: Some(3),
            current_usage: 1,
            created_at: Utc::now(),
        }
    }

    fn request() -> RedemptionRequest {
        RedemptionRequest {
            patient_id: "P-001".to_string(),
            treatment_amount: dec("300000"),
            admin_fee: dec("25000"),
            used_by: "frontdesk".to_string(),
            transaction_type: TransactionType::Treatment,
        }
    }

    #[test]
    fn test_usage_record_mirrors_breakdown() {
        let v = voucher();
        let breakdown = build_breakdown(&v, dec("300000"), dec("25000"));
        let record = record_redemption(&v, &breakdown, &request(), Uuid::new_v4(), Utc::now(), 1);

        let usage = &record.usage_record;
        assert_eq!(usage.voucher_id, "v-1");
        assert_eq!(usage.voucher_code, "FIXED50");
        assert_eq!(usage.discount_amount, dec("50000"));
        assert_eq!(usage.discounted_treatment_amount, dec("250000"));
        assert_eq!(usage.admin_fee, dec("25000"));
        assert_eq!(usage.final_total_amount, dec("275000"));
        assert_eq!(
            usage.final_total_amount,
            usage.discounted_treatment_amount + usage.admin_fee
        );
    }

    #[test]
    fn test_current_usage_incremented() {
        let v = voucher();
        let breakdown = build_breakdown(&v, dec("300000"), dec("0"));
        let record = record_redemption(&v, &breakdown, &request(), Uuid::new_v4(), Utc::now(), 1);
        assert_eq!(record.updated_voucher.current_usage, 2);
        assert_eq!(v.current_usage, 1);
    }

    #[test]
    fn test_transaction_type_defaults_to_treatment() {
        let json = r#"{
            "patient_id": "P-001",
            "treatment_amount": "100000",
            "used_by": "frontdesk"
        }"#;
        let req: RedemptionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.transaction_type, TransactionType::Treatment);
        assert_eq!(req.admin_fee, Decimal::ZERO);
    }
}
