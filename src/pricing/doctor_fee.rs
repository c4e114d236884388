//! Doctor fee reconciliation against sitting fees.
//!
//! Per-encounter doctor fees are summed per (doctor, shift, date). The agreed
//! sitting fee for that shift acts as a floor: a doctor is never paid less
//! than it, but it is not added on top of a higher computed fee.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::{AuditStep, DoctorFeeLedgerEntry, ShiftKey, SittingFeeRecord, TreatmentEncounter};
use crate::money::non_negative;

use super::encounter_totals::encounter_totals;

/// Returns the payable fee for one shift.
///
/// # Examples
///
/// ```
/// use clinic_billing::pricing::payable_fee;
/// use rust_decimal::Decimal;
///
/// // Nothing billed: the sitting fee is paid.
/// assert_eq!(payable_fee(Decimal::ZERO, Decimal::new(100_000, 0)), Decimal::new(100_000, 0));
/// // Billed above the floor: the computed fee is paid, not fee + floor.
/// assert_eq!(payable_fee(Decimal::new(250_000, 0), Decimal::new(100_000, 0)), Decimal::new(250_000, 0));
/// ```
pub fn payable_fee(computed_fee: Decimal, sitting_fee: Decimal) -> Decimal {
    if computed_fee > Decimal::ZERO {
        computed_fee.max(sitting_fee)
    } else {
        sitting_fee
    }
}

/// The doctor's share of one encounter's net treatment total.
///
/// Medication and the admin fee never enter the doctor fee, so the admin
/// default passed to the aggregator does not matter.
pub fn encounter_doctor_fee(encounter: &TreatmentEncounter) -> Decimal {
    encounter_totals(encounter, Decimal::ZERO).doctor_fee
}

#[derive(Default)]
struct GroupAccumulator {
    encounter_count: u32,
    computed_fee: Decimal,
    sitting_fee: Option<Decimal>,
}

/// Reconciles doctor fees for every (doctor, shift, date) group.
///
/// Groups come from both inputs: a doctor with a sitting fee but no
/// encounters still gets an entry. When several sitting-fee records share a
/// key, the last one wins.
///
/// # Arguments
///
/// * `encounters` - The encounters to reconcile
/// * `sitting_fees` - Sitting-fee records for the same period
///
/// # Returns
///
/// A map keyed by [`ShiftKey`], ordered by doctor, date and shift.
pub fn reconcile_doctor_fees(
    encounters: &[TreatmentEncounter],
    sitting_fees: &[SittingFeeRecord],
) -> BTreeMap<ShiftKey, DoctorFeeLedgerEntry> {
    let mut groups: BTreeMap<ShiftKey, GroupAccumulator> = BTreeMap::new();

    for encounter in encounters {
        let group = groups.entry(encounter.shift_key()).or_default();
        group.encounter_count += 1;
        group.computed_fee = group.computed_fee.saturating_add(encounter_doctor_fee(encounter));
    }

    for record in sitting_fees {
        groups.entry(record.key()).or_default().sitting_fee = Some(non_negative(record.amount));
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(index, (key, group))| {
            let sitting_fee = group.sitting_fee.unwrap_or(Decimal::ZERO);
            let payable = payable_fee(group.computed_fee, sitting_fee);
            let sitting_fee_applied = group.computed_fee < sitting_fee;

            let reasoning = if group.computed_fee.is_zero() {
                format!(
                    "No fee earned from {} encounter(s); sitting fee {} paid",
                    group.encounter_count, sitting_fee
                )
            } else if sitting_fee_applied {
                format!(
                    "Computed fee {} is below sitting fee {}; sitting fee paid",
                    group.computed_fee, sitting_fee
                )
            } else {
                format!(
                    "Computed fee {} meets sitting fee {}; computed fee paid",
                    group.computed_fee, sitting_fee
                )
            };

            let audit_step = AuditStep {
                step_number: index as u32 + 1,
                rule_id: "sitting_fee_reconciliation".to_string(),
                rule_name: "Sitting Fee Reconciliation".to_string(),
                input: serde_json::json!({
                    "doctor_id": key.doctor_id,
                    "shift": key.shift.as_str(),
                    "date": key.date.to_string(),
                    "encounter_count": group.encounter_count,
                    "computed_fee": group.computed_fee.to_string(),
                    "sitting_fee": sitting_fee.to_string()
                }),
                output: serde_json::json!({
                    "payable_fee": payable.to_string(),
                    "sitting_fee_applied": sitting_fee_applied
                }),
                reasoning,
            };

            let entry = DoctorFeeLedgerEntry {
                key: key.clone(),
                encounter_count: group.encounter_count,
                computed_fee: group.computed_fee,
                sitting_fee,
                payable_fee: payable,
                sitting_fee_applied,
                audit_step,
            };
            (key, entry)
        })
        .collect()
}
