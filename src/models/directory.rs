//! Read-only directory entities the engines consume.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ClinicShift, ShiftKey};

/// A registered patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Unique identifier of the patient.
    pub id: String,
    /// Full name.
    pub name: String,
    /// The clinic's medical record number.
    pub medical_record_number: String,
}

/// A practising doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    /// Unique identifier of the doctor.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Specialization (e.g. "orthodontics").
    #[serde(default)]
    pub specialization: String,
}

/// A guaranteed minimum fee for one doctor on one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SittingFeeRecord {
    /// The doctor the floor applies to.
    pub doctor_id: String,
    /// The shift window.
    pub shift: ClinicShift,
    /// The calendar date.
    pub date: NaiveDate,
    /// The agreed minimum, in whole currency units.
    pub amount: Decimal,
}

impl SittingFeeRecord {
    /// The (doctor, shift, date) key this record applies to.
    pub fn key(&self) -> ShiftKey {
        ShiftKey::new(self.doctor_id.clone(), self.shift, self.date)
    }
}
