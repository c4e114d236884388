//! Treatment encounter models.
//!
//! An encounter is one billed visit for one patient with one doctor on one
//! shift. Totals and doctor-fee ledger entries are derived from encounters and
//! are never stored independently of them.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AuditStep, AuditTrace, MedicationLineItem, TreatmentLineItem};

/// The fixed shift windows the clinic operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicShift {
    /// Morning session.
    Morning,
    /// Afternoon session.
    Afternoon,
    /// Evening session.
    Evening,
}

impl ClinicShift {
    /// Returns the wire name of the shift.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicShift::Morning => "morning",
            ClinicShift::Afternoon => "afternoon",
            ClinicShift::Evening => "evening",
        }
    }
}

impl fmt::Display for ClinicShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one doctor working one shift on one date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShiftKey {
    /// The treating doctor.
    pub doctor_id: String,
    /// The calendar date.
    pub date: NaiveDate,
    /// The shift window.
    pub shift: ClinicShift,
}

impl ShiftKey {
    /// Creates a new key.
    pub fn new(doctor_id: impl Into<String>, shift: ClinicShift, date: NaiveDate) -> Self {
        Self {
            doctor_id: doctor_id.into(),
            date,
            shift,
        }
    }
}

impl fmt::Display for ShiftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.doctor_id, self.shift, self.date)
    }
}

/// One billing event for one patient, doctor, date and shift.
///
/// Edits re-submit the whole encounter; there is no partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentEncounter {
    /// Unique identifier of the encounter.
    pub id: String,
    /// The patient being treated.
    pub patient_id: String,
    /// The treating doctor.
    pub doctor_id: String,
    /// The date of the visit.
    pub date: NaiveDate,
    /// The shift the visit took place in.
    pub shift: ClinicShift,
    /// Procedures performed.
    #[serde(default)]
    pub line_items: Vec<TreatmentLineItem>,
    /// Medication dispensed.
    #[serde(default)]
    pub medications: Vec<MedicationLineItem>,
    /// Share of the net treatment total paid to the doctor (0–100).
    pub fee_percentage: Decimal,
    /// Admin fee for this encounter; the clinic default applies when absent.
    #[serde(default)]
    pub admin_fee_override: Option<Decimal>,
}

impl TreatmentEncounter {
    /// The (doctor, shift, date) group this encounter belongs to.
    pub fn shift_key(&self) -> ShiftKey {
        ShiftKey::new(self.doctor_id.clone(), self.shift, self.date)
    }
}

/// Derived totals for an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterTotals {
    /// Sum of undiscounted treatment prices.
    pub subtotal: Decimal,
    /// Sum of line-item discounts.
    pub total_discount: Decimal,
    /// `subtotal − total_discount`.
    pub net_treatment_total: Decimal,
    /// Voucher discount taken off the net treatment total (zero if none).
    pub voucher_discount: Decimal,
    /// Sum of medication line totals.
    pub medication_cost: Decimal,
    /// The admin fee actually charged.
    pub effective_admin_fee: Decimal,
    /// `net_treatment_total − voucher_discount + medication_cost + effective_admin_fee`.
    pub grand_total: Decimal,
    /// The treating doctor's share of the net treatment total.
    pub doctor_fee: Decimal,
    /// How the totals were derived.
    pub audit_trace: AuditTrace,
}

/// A doctor's payable fee for one (doctor, shift, date) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorFeeLedgerEntry {
    /// The group this entry covers.
    #[serde(flatten)]
    pub key: ShiftKey,
    /// Number of encounters in the group.
    pub encounter_count: u32,
    /// Sum of per-encounter doctor fees.
    pub computed_fee: Decimal,
    /// The agreed minimum for the shift (zero if none was agreed).
    pub sitting_fee: Decimal,
    /// What the doctor is paid for the shift.
    pub payable_fee: Decimal,
    /// True when the sitting fee, not the computed fee, set the payment.
    pub sitting_fee_applied: bool,
    /// Record of the reconciliation decision.
    pub audit_step: AuditStep,
}
