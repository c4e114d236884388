//! Request types for the clinic billing API.
//!
//! Most endpoints accept domain types directly. The types here cover
//! requests whose wire shape differs from the stored record.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ClinicShift, MedicationLineItem, TreatmentEncounter, TreatmentLineItem, VoucherAssignment,
};

/// An encounter as submitted by the billing form.
///
/// `id` is generated when absent and `fee_percentage` falls back to the
/// clinic default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterRequest {
    /// Existing encounter id, when editing.
    #[serde(default)]
    pub id: Option<String>,
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
    /// Doctor's share of the net treatment total (0–100).
    #[serde(default)]
    pub fee_percentage: Option<Decimal>,
    /// Admin fee for this encounter.
    #[serde(default)]
    pub admin_fee_override: Option<Decimal>,
}

impl EncounterRequest {
    /// Converts the request into an encounter.
    pub fn into_encounter(self, default_fee_percentage: Decimal) -> TreatmentEncounter {
        TreatmentEncounter {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            date: self.date,
            shift: self.shift,
            line_items: self.line_items,
            medications: self.medications,
            fee_percentage: self.fee_percentage.unwrap_or(default_fee_percentage),
            admin_fee_override: self.admin_fee_override,
        }
    }
}

/// Request body for the `/encounter-totals` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsRequest {
    /// The encounter to price.
    #[serde(flatten)]
    pub encounter: EncounterRequest,
    /// Voucher to preview against the net treatment total.
    #[serde(default)]
    pub voucher_code: Option<String>,
}

/// Request body for the `/voucher-assignments` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRequest {
    /// The voucher to assign.
    pub voucher_id: String,
    /// The intended recipient.
    pub patient_id: String,
    /// Optional note for front-desk staff.
    #[serde(default)]
    pub note: Option<String>,
}

impl AssignmentRequest {
    /// Converts the request into an assignment made at `now`.
    pub fn into_assignment(self, now: DateTime<Utc>) -> VoucherAssignment {
        VoucherAssignment {
            voucher_id: self.voucher_id,
            patient_id: self.patient_id,
            assigned_at: now,
            note: self.note,
        }
    }
}
