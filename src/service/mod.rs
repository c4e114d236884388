//! I/O orchestration around the pure engines.
//!
//! Services read inputs from the [`ClinicRepository`](crate::store::ClinicRepository),
//! run the pricing and voucher rules, and write results back. They hold no
//! state of their own besides configuration.

mod billing;
mod voucher;

pub use billing::BillingService;
pub use voucher::{NewVoucher, VoucherService};
