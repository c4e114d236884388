//! Encounter total aggregation.
//!
//! Totals are recomputed from the line items every time; nothing here is
//! cached. The doctor's fee is taken from the net treatment total only, never
//! from medication or the admin fee.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditStep, AuditTrace, DiscountMode, EncounterTotals, MedicationLineItem, TreatmentEncounter,
    TreatmentLineItem,
};
use crate::money::{MAX_AMOUNT, clamp_percentage, non_negative, percent_of, within_limit};

use super::line_discount::price_line_item;

/// Aggregates the totals for one encounter.
///
/// # Arguments
///
/// * `line_items` - Treatment lines; order does not affect totals
/// * `medications` - Dispensed medication
/// * `fee_percentage` - Doctor's share of the net treatment total (clamped to 0–100)
/// * `admin_fee_override` - Per-encounter admin fee, if any
/// * `default_admin_fee` - The clinic default, from configuration
///
/// # Examples
///
/// ```
/// use clinic_billing::models::{MedicationLineItem, TreatmentLineItem};
/// use clinic_billing::pricing::aggregate_encounter_totals;
/// use rust_decimal::Decimal;
///
/// let items = vec![TreatmentLineItem::new("tx-1", "Crown", Decimal::new(1_000_000, 0))];
/// let meds = vec![MedicationLineItem {
///     id: "med-1".to_string(),
///     name: "Analgesic".to_string(),
///     unit_price: Decimal::new(15_000, 0),
///     quantity: 10,
/// }];
///
/// let totals = aggregate_encounter_totals(
///     &items,
///     &meds,
///     Decimal::new(40, 0),
///     None,
///     Decimal::new(25_000, 0),
/// );
///
/// assert_eq!(totals.doctor_fee, Decimal::new(400_000, 0));
/// assert_eq!(totals.grand_total, Decimal::new(1_175_000, 0));
/// ```
pub fn aggregate_encounter_totals(
    line_items: &[TreatmentLineItem],
    medications: &[MedicationLineItem],
    fee_percentage: Decimal,
    admin_fee_override: Option<Decimal>,
    default_admin_fee: Decimal,
) -> EncounterTotals {
    let mut trace = AuditTrace::default();

    let mut subtotal = Decimal::ZERO;
    let mut total_discount = Decimal::ZERO;
    for item in line_items {
        let priced = price_line_item(item, trace.next_step_number());
        subtotal = subtotal.saturating_add(non_negative(item.unit_price));
        total_discount = total_discount.saturating_add(priced.discount_amount);
        trace.push(priced.audit_step);
    }
    let net_treatment_total = non_negative(subtotal.saturating_sub(total_discount));

    let medication_cost = medications
        .iter()
        .fold(Decimal::ZERO, |sum, m| sum.saturating_add(m.line_total()));

    let (effective_admin_fee, admin_source) = match admin_fee_override {
        Some(fee) => (non_negative(fee), "encounter_override"),
        None => (non_negative(default_admin_fee), "clinic_default"),
    };
    trace.push(AuditStep {
        step_number: trace.next_step_number(),
        rule_id: "admin_fee".to_string(),
        rule_name: "Admin Fee".to_string(),
        input: serde_json::json!({
            "admin_fee_override": admin_fee_override.map(|f| f.normalize().to_string()),
            "default_admin_fee": default_admin_fee.normalize().to_string()
        }),
        output: serde_json::json!({
            "effective_admin_fee": effective_admin_fee.to_string(),
            "source": admin_source
        }),
        reasoning: format!("Admin fee {} from {}", effective_admin_fee, admin_source),
    });

    let fee_percentage = clamp_percentage(fee_percentage);
    let doctor_fee = percent_of(net_treatment_total, fee_percentage);
    trace.push(AuditStep {
        step_number: trace.next_step_number(),
        rule_id: "doctor_fee".to_string(),
        rule_name: "Doctor Fee".to_string(),
        input: serde_json::json!({
            "net_treatment_total": net_treatment_total.to_string(),
            "fee_percentage": fee_percentage.normalize().to_string()
        }),
        output: serde_json::json!({
            "doctor_fee": doctor_fee.to_string()
        }),
        reasoning: format!(
            "{}% of net treatment total {} = {} (medication and admin fee excluded)",
            fee_percentage.normalize(),
            net_treatment_total,
            doctor_fee
        ),
    });

    let grand_total = net_treatment_total
        .saturating_add(medication_cost)
        .saturating_add(effective_admin_fee);

    EncounterTotals {
        subtotal,
        total_discount,
        net_treatment_total,
        voucher_discount: Decimal::ZERO,
        medication_cost,
        effective_admin_fee,
        grand_total,
        doctor_fee,
        audit_trace: trace,
    }
}

/// Aggregates the totals for a stored encounter.
pub fn encounter_totals(encounter: &TreatmentEncounter, default_admin_fee: Decimal) -> EncounterTotals {
    aggregate_encounter_totals(
        &encounter.line_items,
        &encounter.medications,
        encounter.fee_percentage,
        encounter.admin_fee_override,
        default_admin_fee,
    )
}

impl EncounterTotals {
    /// Applies a voucher discount to the treatment portion of the bill.
    ///
    /// The discount is clamped to the net treatment total and never touches
    /// medication or the admin fee. The doctor fee is left as computed.
    pub fn with_voucher_discount(mut self, discount: Decimal) -> Self {
        let applied = non_negative(discount).min(self.net_treatment_total);
        self.voucher_discount = applied;
        self.grand_total = (self.net_treatment_total - applied)
            .saturating_add(self.medication_cost)
            .saturating_add(self.effective_admin_fee);
        self.audit_trace.push(AuditStep {
            step_number: self.audit_trace.next_step_number(),
            rule_id: "voucher_discount".to_string(),
            rule_name: "Voucher Discount".to_string(),
            input: serde_json::json!({
                "requested_discount": discount.normalize().to_string(),
                "net_treatment_total": self.net_treatment_total.to_string()
            }),
            output: serde_json::json!({
                "voucher_discount": applied.to_string(),
                "grand_total": self.grand_total.to_string()
            }),
            reasoning: format!(
                "Voucher discount {} applied to treatment only; admin fee {} charged in full",
                applied, self.effective_admin_fee
            ),
        });
        self
    }
}

/// Rejects encounter input that cannot be priced sensibly.
///
/// Fixed discounts larger than the item price are not rejected; they are
/// clamped during pricing.
pub fn validate_encounter(encounter: &TreatmentEncounter) -> EngineResult<()> {
    if encounter.fee_percentage < Decimal::ZERO || encounter.fee_percentage > Decimal::ONE_HUNDRED
    {
        return Err(EngineError::InvalidEncounter {
            field: "fee_percentage".to_string(),
            message: format!("must be between 0 and 100, got {}", encounter.fee_percentage),
        });
    }

    if let Some(fee) = encounter.admin_fee_override {
        if fee < Decimal::ZERO {
            return Err(EngineError::InvalidEncounter {
                field: "admin_fee_override".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        if !within_limit(fee) {
            return Err(EngineError::InvalidEncounter {
                field: "admin_fee_override".to_string(),
                message: format!("must not exceed {}", MAX_AMOUNT),
            });
        }
    }

    for item in &encounter.line_items {
        validate_line_item(item)?;
    }

    for med in &encounter.medications {
        if med.unit_price < Decimal::ZERO {
            return Err(EngineError::InvalidLineItem {
                item_id: med.id.clone(),
                message: "unit price must not be negative".to_string(),
            });
        }
        if med.quantity == 0 {
            return Err(EngineError::InvalidLineItem {
                item_id: med.id.clone(),
                message: "quantity must be positive".to_string(),
            });
        }
        if !within_limit(med.unit_price) {
            return Err(EngineError::InvalidLineItem {
                item_id: med.id.clone(),
                message: format!("unit price must not exceed {}", MAX_AMOUNT),
            });
        }
    }

    Ok(())
}

fn validate_line_item(item: &TreatmentLineItem) -> EngineResult<()> {
    if item.unit_price < Decimal::ZERO {
        return Err(EngineError::InvalidLineItem {
            item_id: item.id.clone(),
            message: "unit price must not be negative".to_string(),
        });
    }
    if !within_limit(item.unit_price) || !within_limit(item.discount_input) {
        return Err(EngineError::InvalidLineItem {
            item_id: item.id.clone(),
            message: format!("amounts must not exceed {}", MAX_AMOUNT),
        });
    }
    if item.discount_input < Decimal::ZERO {
        return Err(EngineError::InvalidLineItem {
            item_id: item.id.clone(),
            message: "discount must not be negative".to_string(),
        });
    }
    if item.discount_mode == DiscountMode::Percentage && item.discount_input > Decimal::ONE_HUNDRED
    {
        return Err(EngineError::InvalidLineItem {
            item_id: item.id.clone(),
            message: format!("percentage discount {} exceeds 100", item.discount_input),
        });
    }
    Ok(())
}
