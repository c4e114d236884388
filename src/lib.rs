//! Billing engine for dental clinics.
//!
//! This crate prices treatment encounters (line-item discounts, admin fee,
//! medication cost, doctor fee), reconciles doctor fees against per-shift
//! sitting fees, and validates and redeems discount vouchers. The pricing and
//! voucher rules are pure functions; the [`service`] layer runs them against
//! a versioned key-value [`store`] and the [`api`] module serves them over
//! HTTP.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod money;
pub mod pricing;
pub mod service;
pub mod store;
pub mod voucher;
