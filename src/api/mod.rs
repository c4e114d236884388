//! HTTP API module for the clinic billing engine.
//!
//! This module provides the REST API endpoints for pricing encounters,
//! reconciling doctor fees and managing vouchers.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{AssignmentRequest, EncounterRequest, TotalsRequest};
pub use response::{ApiError, ApiErrorResponse, TotalsResponse};
pub use state::{AppState, Clock};
