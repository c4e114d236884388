//! Configuration loading for the clinic billing engine.
//!
//! This module loads clinic metadata, billing defaults, the store retry
//! policy, and optional sitting-fee seed tables from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use clinic_billing::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/clinic").unwrap();
//! println!("Loaded clinic: {}", config.clinic().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BillingConfig, ClinicConfig, ClinicInfo, RetryConfig, SittingFeeEntry, SittingFeeTable,
};
