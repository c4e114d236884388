//! Configuration types for the clinic.
//!
//! These structures are deserialized from the YAML files in the
//! configuration directory.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{ClinicShift, SittingFeeRecord};

/// Identifying information about the clinic.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicInfo {
    /// Display name of the clinic.
    pub name: String,
    /// Currency code shown next to amounts (e.g. "IDR").
    pub currency: String,
}

/// Billing defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Admin fee charged when an encounter has no override.
    pub default_admin_fee: Decimal,
    /// Doctor fee percentage used when an encounter omits one.
    pub default_fee_percentage: Decimal,
}

/// Store retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per store call, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single retry delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Attempts a redemption makes before giving up on a contended voucher.
    #[serde(default = "default_redemption_attempts")]
    pub redemption_attempts: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_redemption_attempts() -> u32 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            redemption_attempts: default_redemption_attempts(),
        }
    }
}

/// Contents of `clinic.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicConfig {
    /// Clinic metadata.
    pub clinic: ClinicInfo,
    /// Billing defaults.
    pub billing: BillingConfig,
    /// Store retry settings.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// One entry in a sitting-fee seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SittingFeeEntry {
    /// The doctor.
    pub doctor_id: String,
    /// The shift window.
    pub shift: ClinicShift,
    /// The agreed minimum fee.
    pub amount: Decimal,
}

/// A sitting-fee seed file: every agreed floor for one date.
#[derive(Debug, Clone, Deserialize)]
pub struct SittingFeeTable {
    /// The date the fees apply to.
    pub date: NaiveDate,
    /// The fees.
    pub fees: Vec<SittingFeeEntry>,
}

impl SittingFeeTable {
    /// Expands the table into one record per entry.
    pub fn records(&self) -> Vec<SittingFeeRecord> {
        self.fees
            .iter()
            .map(|entry| SittingFeeRecord {
                doctor_id: entry.doctor_id.clone(),
                shift: entry.shift,
                date: self.date,
                amount: entry.amount,
            })
            .collect()
    }
}
