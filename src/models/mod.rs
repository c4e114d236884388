//! Core data models for the clinic billing engine.
//!
//! This module contains all the domain models used throughout the engine.

mod audit;
mod directory;
mod encounter;
mod line_item;
mod voucher;

pub use audit::{AuditStep, AuditTrace};
pub use directory::{Doctor, Patient, SittingFeeRecord};
pub use encounter::{ClinicShift, DoctorFeeLedgerEntry, EncounterTotals, ShiftKey, TreatmentEncounter};
pub use line_item::{DiscountMode, MedicationLineItem, TreatmentLineItem};
pub use voucher::{
    DiscountType, TransactionType, Voucher, VoucherAssignment, VoucherStatus, VoucherUsageRecord,
};
