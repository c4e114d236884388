//! Voucher lifecycle against the store.
//!
//! Redemption is the one read-check-write sequence in the clinic that must
//! not race. Each attempt reads the voucher with its version, re-runs the
//! full eligibility check against fresh usage records, then commits the
//! usage record and the incremented counter in one batch conditioned on that
//! version. A concurrent redemption bumps the version and forces a re-read.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{DiscountType, Voucher, VoucherAssignment};
use crate::store::{ClinicRepository, Precondition, keys};
use crate::voucher::{
    AssignmentReminder, RedemptionRecord, RedemptionRequest, ValidationOutcome, ValidationRequest,
    ValidationResult, VoucherStats, VoucherStatusReport, assignment_reminder,
    compute_voucher_stats, compute_voucher_status, record_redemption, validate_voucher,
};

use super::billing::{require_non_empty, require_within_limit};

/// Fields supplied when creating a voucher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVoucher {
    /// Redemption code; normalised to uppercase.
    pub code: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// How `discount_value` is interpreted.
    pub discount_type: DiscountType,
    /// Percentage (0–100) or amount.
    pub discount_value: Decimal,
    /// Cap on a percentage discount.
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    /// Minimum treatment amount.
    #[serde(default)]
    pub min_amount: Option<Decimal>,
    /// Minimum purchase.
    #[serde(default)]
    pub min_purchase: Option<Decimal>,
    /// Last redeemable day.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Cap on total redemptions.
    #[serde(default)]
    pub usage_limit: Option<u32>,
}

impl NewVoucher {
    fn validate(&self) -> EngineResult<()> {
        require_non_empty("voucher code", &self.code)?;

        if self.discount_value.is_sign_negative() {
            return Err(EngineError::invalid_input(
                "discount value",
                "must not be negative",
            ));
        }
        if self.discount_type == DiscountType::Percentage && self.discount_value > Decimal::ONE_HUNDRED {
            return Err(EngineError::invalid_input(
                "discount value",
                format!("percentage must be between 0 and 100, got {}", self.discount_value),
            ));
        }

        let amounts = [
            ("max discount", self.max_discount),
            ("min amount", self.min_amount),
            ("min purchase", self.min_purchase),
        ];
        for (field, amount) in amounts {
            if let Some(amount) = amount {
                if amount.is_sign_negative() {
                    return Err(EngineError::invalid_input(field, "must not be negative"));
                }
                require_within_limit(field, amount)?;
            }
        }
        require_within_limit("discount value", self.discount_value)
    }
}

/// Creates, checks and redeems vouchers.
#[derive(Clone)]
pub struct VoucherService {
    repo: ClinicRepository,
    redemption_attempts: u32,
}

impl VoucherService {
    /// Creates a voucher service.
    ///
    /// `redemption_attempts` bounds how many times a redemption re-reads and
    /// retries after losing a race to a concurrent writer.
    pub fn new(repo: ClinicRepository, redemption_attempts: u32) -> Self {
        Self {
            repo,
            redemption_attempts: redemption_attempts.max(1),
        }
    }

    /// Creates a voucher.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for out-of-range amounts
    /// - `DuplicateVoucherCode` if another voucher already has the code
    pub async fn create_voucher(&self, new: NewVoucher, now: DateTime<Utc>) -> EngineResult<Voucher> {
        new.validate()?;

        let code = Voucher::normalize_code(&new.code);
        let voucher = Voucher {
            id: Uuid::new_v4().to_string(),
            code: code.clone(),
            description: new.description,
            is_active: true,
            discount_type: new.discount_type,
            discount_value: new.discount_value,
            max_discount: new.max_discount,
            min_amount: new.min_amount,
            min_purchase: new.min_purchase,
            expiry_date: new.expiry_date,
            usage_limit: new.usage_limit,
            current_usage: 0,
            created_at: now,
        };

        let code_key = keys::voucher_code(&code);
        let ops = vec![
            ClinicRepository::put_op(code_key.clone(), &voucher.id, Precondition::Absent)?,
            ClinicRepository::put_op(keys::voucher(&voucher.id), &voucher, Precondition::Absent)?,
        ];

        match self.repo.commit(ops).await {
            Ok(()) => {
                info!(voucher_id = %voucher.id, code = %code, "Voucher created");
                Ok(voucher)
            }
            Err(EngineError::WriteConflict { key }) if key == code_key => {
                // A retried commit conflicts with its own earlier write when
                // the first acknowledgement was lost.
                if self.repo.voucher_id_for_code(&code).await?.as_deref() == Some(voucher.id.as_str()) {
                    info!(voucher_id = %voucher.id, code = %code, "Voucher created");
                    return Ok(voucher);
                }
                Err(EngineError::DuplicateVoucherCode { code })
            }
            Err(err) => Err(err),
        }
    }

    /// Lists every voucher.
    pub async fn list_vouchers(&self) -> EngineResult<Vec<Voucher>> {
        self.repo.vouchers().await
    }

    /// Deactivates a voucher. Deactivation is permanent and idempotent.
    pub async fn deactivate_voucher(&self, voucher_id: &str) -> EngineResult<Voucher> {
        for _ in 0..self.redemption_attempts {
            let current = self
                .repo
                .voucher(voucher_id)
                .await?
                .ok_or_else(|| EngineError::not_found("voucher", voucher_id))?;
            if !current.value.is_active {
                return Ok(current.value);
            }

            let mut updated = current.value;
            updated.is_active = false;
            let op = ClinicRepository::put_op(
                keys::voucher(voucher_id),
                &updated,
                Precondition::Version(current.version),
            )?;

            match self.repo.commit(vec![op]).await {
                Ok(()) => {
                    info!(voucher_id = %voucher_id, "Voucher deactivated");
                    return Ok(updated);
                }
                Err(EngineError::WriteConflict { .. }) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(EngineError::WriteConflict {
            key: keys::voucher(voucher_id),
        })
    }

    /// Checks a code against a bill without changing anything.
    pub async fn validate(&self, request: &ValidationRequest, today: NaiveDate) -> EngineResult<ValidationResult> {
        require_within_limit("treatment amount", request.treatment_amount)?;
        require_within_limit("admin fee", request.admin_fee)?;
        let code = Voucher::normalize_code(&request.code);
        let voucher = match self.repo.voucher_id_for_code(&code).await? {
            Some(id) => self.repo.voucher(&id).await?.map(|v| v.value),
            None => None,
        };

        let (vouchers, usages) = match voucher {
            Some(voucher) => {
                let usages = self.repo.voucher_usages(&voucher.id).await?;
                (vec![voucher], usages)
            }
            None => (Vec::new(), Vec::new()),
        };

        let result = validate_voucher(request, &vouchers, &usages, today, 1);
        if let ValidationOutcome::Rejected { reason, .. } = &result.outcome {
            info!(code = %code, reason = reason.code(), "Voucher check rejected");
        }
        Ok(result)
    }

    /// Redeems a voucher against a bill.
    ///
    /// Succeeds only once the usage record and counter increment are
    /// committed together. If a commit's outcome is unknown, the next attempt
    /// finds the record by id instead of writing a second one.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown voucher or patient
    /// - `VoucherRejected` if the voucher fails eligibility on fresh state
    /// - `RedemptionConflict` if every attempt lost a race
    /// - `Persistence` / `Cancelled` from the store
    pub async fn redeem(
        &self,
        voucher_id: &str,
        request: &RedemptionRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<RedemptionRecord> {
        require_non_empty("used_by", &request.used_by)?;
        require_within_limit("treatment amount", request.treatment_amount)?;
        require_within_limit("admin fee", request.admin_fee)?;
        if self.repo.patient(&request.patient_id).await?.is_none() {
            return Err(EngineError::not_found("patient", &request.patient_id));
        }

        let usage_id = Uuid::new_v4();
        let today = now.date_naive();
        let mut pending: Option<RedemptionRecord> = None;

        for attempt in 1..=self.redemption_attempts {
            let current = self
                .repo
                .voucher(voucher_id)
                .await?
                .ok_or_else(|| EngineError::not_found("voucher", voucher_id))?;
            let usages = self.repo.voucher_usages(voucher_id).await?;

            if usages.iter().any(|u| u.id == usage_id) {
                if let Some(mut record) = pending.take() {
                    record.updated_voucher = current.value;
                    return Ok(record);
                }
            }

            let check = ValidationRequest {
                code: current.value.code.clone(),
                treatment_amount: request.treatment_amount,
                admin_fee: request.admin_fee,
                patient_id: Some(request.patient_id.clone()),
            };
            let result = validate_voucher(&check, std::slice::from_ref(&current.value), &usages, today, 1);
            let breakdown = match result.outcome {
                ValidationOutcome::Valid { breakdown, .. } => breakdown,
                ValidationOutcome::Rejected { reason, .. } => {
                    warn!(voucher_id = %voucher_id, reason = reason.code(), "Redemption rejected");
                    return Err(EngineError::VoucherRejected { reason });
                }
            };

            let record = record_redemption(&current.value, &breakdown, request, usage_id, now, 2);
            let ops = vec![
                ClinicRepository::put_op(
                    keys::voucher(voucher_id),
                    &record.updated_voucher,
                    Precondition::Version(current.version),
                )?,
                ClinicRepository::put_op(
                    keys::voucher_usage(voucher_id, usage_id),
                    &record.usage_record,
                    Precondition::Absent,
                )?,
            ];
            pending = Some(record.clone());

            match self.repo.commit(ops).await {
                Ok(()) => {
                    info!(
                        voucher_id = %voucher_id,
                        usage_id = %usage_id,
                        patient_id = %request.patient_id,
                        discount = %record.usage_record.discount_amount,
                        current_usage = record.updated_voucher.current_usage,
                        "Voucher redeemed"
                    );
                    return Ok(record);
                }
                Err(EngineError::WriteConflict { key }) => {
                    warn!(
                        voucher_id = %voucher_id,
                        key = %key,
                        attempt = attempt,
                        "Redemption lost a concurrent update, re-reading"
                    );
                    tokio::task::yield_now().await;
                }
                Err(err) => return Err(err),
            }
        }

        Err(EngineError::RedemptionConflict {
            voucher_id: voucher_id.to_string(),
            attempts: self.redemption_attempts,
        })
    }

    /// Derives a voucher's status from its usage records.
    pub async fn status(&self, voucher_id: &str, today: NaiveDate) -> EngineResult<VoucherStatusReport> {
        let voucher = self
            .repo
            .voucher(voucher_id)
            .await?
            .ok_or_else(|| EngineError::not_found("voucher", voucher_id))?;
        let usages = self.repo.voucher_usages(voucher_id).await?;
        Ok(compute_voucher_status(&voucher.value, &usages, today))
    }

    /// Aggregates statistics over all vouchers.
    pub async fn stats(&self, today: NaiveDate) -> EngineResult<VoucherStats> {
        let vouchers = self.repo.vouchers().await?;
        let usages = self.repo.all_voucher_usages().await?;
        Ok(compute_voucher_stats(&vouchers, &usages, today))
    }

    /// Records that a voucher was issued for a patient.
    pub async fn assign_voucher(&self, assignment: VoucherAssignment) -> EngineResult<VoucherAssignment> {
        if self.repo.voucher(&assignment.voucher_id).await?.is_none() {
            return Err(EngineError::not_found("voucher", &assignment.voucher_id));
        }
        if self.repo.patient(&assignment.patient_id).await?.is_none() {
            return Err(EngineError::not_found("patient", &assignment.patient_id));
        }

        self.repo.put_assignment(&assignment).await?;
        info!(
            voucher_id = %assignment.voucher_id,
            patient_id = %assignment.patient_id,
            "Voucher assigned"
        );
        Ok(assignment)
    }

    /// Reminders for every voucher assigned to a patient.
    pub async fn patient_reminders(
        &self,
        patient_id: &str,
        today: NaiveDate,
    ) -> EngineResult<Vec<AssignmentReminder>> {
        let assignments = self.repo.assignments_for(patient_id).await?;
        let mut reminders = Vec::with_capacity(assignments.len());

        for assignment in &assignments {
            let Some(voucher) = self.repo.voucher(&assignment.voucher_id).await? else {
                continue;
            };
            let usages = self.repo.voucher_usages(&assignment.voucher_id).await?;
            reminders.push(assignment_reminder(assignment, &voucher.value, &usages, today));
        }

        Ok(reminders)
    }
}
