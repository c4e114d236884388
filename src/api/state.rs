//! Application state for the clinic billing API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::ConfigLoader;
use crate::service::{BillingService, VoucherService};
use crate::store::{ClinicRepository, KeyValueStore};

/// Where handlers get the current time from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// The system clock.
    System,
    /// A fixed instant, for tests and replays.
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// The current instant.
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(instant) => *instant,
        }
    }

    /// The current date, used for voucher expiry.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Shared application state.
///
/// Contains resources that are shared across all request handlers: the
/// loaded configuration and the services built on the store.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    billing: BillingService,
    vouchers: VoucherService,
    clock: Clock,
}

impl AppState {
    /// Creates application state over `store`.
    ///
    /// Store calls in flight are abandoned once `shutdown` is cancelled.
    pub fn new(config: ConfigLoader, store: Arc<dyn KeyValueStore>, shutdown: CancellationToken) -> Self {
        let repo = ClinicRepository::new(store, config.retry_policy(), shutdown);
        let billing = BillingService::new(repo.clone(), config.default_admin_fee());
        let vouchers = VoucherService::new(repo, config.redemption_attempts());

        Self {
            config: Arc::new(config),
            billing,
            vouchers,
            clock: Clock::System,
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// The billing service.
    pub fn billing(&self) -> &BillingService {
        &self.billing
    }

    /// The voucher service.
    pub fn vouchers(&self) -> &VoucherService {
        &self.vouchers
    }

    /// The clock.
    pub fn clock(&self) -> Clock {
        self.clock
    }
}
