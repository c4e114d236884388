//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the clinic
//! configuration from YAML files.

use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::models::SittingFeeRecord;
use crate::store::RetryPolicy;

use super::types::{ClinicConfig, ClinicInfo, SittingFeeTable};

/// Loads and provides access to clinic configuration.
///
/// # Directory Structure
///
/// ```text
/// config/clinic/
/// ├── clinic.yaml          # Clinic metadata, billing defaults, retry policy
/// └── sitting_fees/        # Optional seed sitting-fee tables
///     └── 2026-01-15.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use clinic_billing::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/clinic").unwrap();
/// println!("Admin fee: {}", loader.default_admin_fee());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: ClinicConfig,
    sitting_fees: Vec<SittingFeeRecord>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/clinic")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `clinic.yaml` is missing
    /// - Any file contains invalid YAML or out-of-range values
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let clinic_path = path.join("clinic.yaml");
        let config = Self::load_yaml::<ClinicConfig>(&clinic_path)?;
        Self::check_billing(&config, &clinic_path)?;

        let sitting_fees = Self::load_sitting_fees(&path.join("sitting_fees"))?;

        Ok(Self {
            config,
            sitting_fees,
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    fn check_billing(config: &ClinicConfig, path: &Path) -> EngineResult<()> {
        let billing = &config.billing;
        let problem = if billing.default_admin_fee.is_sign_negative() {
            Some("billing.default_admin_fee must not be negative")
        } else if billing.default_fee_percentage.is_sign_negative()
            || billing.default_fee_percentage > Decimal::ONE_HUNDRED
        {
            Some("billing.default_fee_percentage must be between 0 and 100")
        } else {
            None
        };

        match problem {
            Some(message) => Err(EngineError::ConfigParseError {
                path: path.display().to_string(),
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Loads every seed file in the sitting-fees directory, in file-name order.
    ///
    /// A missing directory means there are no seeds.
    fn load_sitting_fees(dir: &Path) -> EngineResult<Vec<SittingFeeRecord>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let dir_str = dir.display().to_string();
        let entries = fs::read_dir(dir).map_err(|_| EngineError::ConfigNotFound {
            path: dir_str.clone(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: dir_str.clone(),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::new();
        for path in paths {
            let table = Self::load_yaml::<SittingFeeTable>(&path)?;
            if let Some(entry) = table.fees.iter().find(|f| f.amount.is_sign_negative()) {
                return Err(EngineError::ConfigParseError {
                    path: path.display().to_string(),
                    message: format!("negative sitting fee for doctor '{}'", entry.doctor_id),
                });
            }
            records.extend(table.records());
        }

        Ok(records)
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &ClinicConfig {
        &self.config
    }

    /// Returns the clinic metadata.
    pub fn clinic(&self) -> &ClinicInfo {
        &self.config.clinic
    }

    /// The admin fee charged when an encounter has no override.
    pub fn default_admin_fee(&self) -> Decimal {
        self.config.billing.default_admin_fee
    }

    /// The doctor fee percentage used when an encounter omits one.
    pub fn default_fee_percentage(&self) -> Decimal {
        self.config.billing.default_fee_percentage
    }

    /// The retry policy for store calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        let retry = &self.config.retry;
        RetryPolicy {
            max_attempts: retry.max_attempts,
            initial_delay: Duration::from_millis(retry.initial_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
        }
    }

    /// How many times a redemption retries a contended voucher.
    pub fn redemption_attempts(&self) -> u32 {
        self.config.retry.redemption_attempts
    }

    /// Sitting fees to seed the store with at startup.
    pub fn sitting_fee_seeds(&self) -> &[SittingFeeRecord] {
        &self.sitting_fees
    }
}
