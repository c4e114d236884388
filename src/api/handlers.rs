//! HTTP request handlers for the clinic billing API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{Doctor, Patient, SittingFeeRecord};
use crate::service::NewVoucher;
use crate::voucher::{RedemptionRequest, ValidationRequest};

use super::request::{AssignmentRequest, EncounterRequest, TotalsRequest};
use super::response::{ApiError, ApiErrorResponse, TotalsResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/encounter-totals", post(encounter_totals_handler))
        .route("/encounters", post(save_encounter_handler))
        .route("/encounters/:date/:id", get(get_encounter_handler))
        .route("/sitting-fees", post(record_sitting_fee_handler))
        .route("/doctor-fees/:date", get(doctor_fee_ledger_handler))
        .route("/patients", post(register_patient_handler))
        .route("/patients/:id/voucher-reminders", get(voucher_reminders_handler))
        .route("/doctors", post(register_doctor_handler))
        .route("/vouchers", post(create_voucher_handler).get(list_vouchers_handler))
        .route("/vouchers/:id/redeem", post(redeem_voucher_handler))
        .route("/vouchers/:id/deactivate", post(deactivate_voucher_handler))
        .route("/vouchers/:id/status", get(voucher_status_handler))
        .route("/voucher-validations", post(validate_voucher_handler))
        .route("/voucher-stats", get(voucher_stats_handler))
        .route("/voucher-assignments", post(assign_voucher_handler))
        .with_state(state)
}

/// Unwraps a JSON body or turns the rejection into a 400 response.
fn parse_body<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    let rejection = match payload {
        Ok(Json(body)) => return Ok(body),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's description of the problem
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };

    Err((
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error),
    )
        .into_response())
}

fn parse_date(correlation_id: Uuid, raw: &str) -> Result<NaiveDate, Response> {
    raw.parse::<NaiveDate>().map_err(|e| {
        warn!(correlation_id = %correlation_id, date = %raw, "Invalid date in path");
        (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "application/json")],
            Json(ApiError::validation_error(format!(
                "Invalid date '{}': {} (expected YYYY-MM-DD)",
                raw, e
            ))),
        )
            .into_response()
    })
}

/// Logs the outcome of an operation and renders it as JSON.
fn respond<T: Serialize>(
    correlation_id: Uuid,
    operation: &str,
    started: Instant,
    success: StatusCode,
    result: EngineResult<T>,
) -> Response {
    match result {
        Ok(body) => {
            info!(
                correlation_id = %correlation_id,
                operation = operation,
                duration_us = started.elapsed().as_micros() as u64,
                "Request completed successfully"
            );
            (
                success,
                [(header::CONTENT_TYPE, "application/json")],
                Json(body),
            )
                .into_response()
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                operation = operation,
                error = %err,
                "Request failed"
            );
            let api_error: ApiErrorResponse = err.into();
            (
                api_error.status,
                [(header::CONTENT_TYPE, "application/json")],
                Json(api_error.error),
            )
                .into_response()
        }
    }
}

macro_rules! try_response {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(response) => return response,
        }
    };
}

/// Handler for POST /encounter-totals.
///
/// Prices an encounter without saving it, optionally previewing a voucher
/// against its net treatment total.
async fn encounter_totals_handler(
    State(state): State<AppState>,
    payload: Result<Json<TotalsRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing encounter totals request");
    let request = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let result = price_encounter(&state, request).await;
    respond(correlation_id, "encounter_totals", started, StatusCode::OK, result)
}

async fn price_encounter(state: &AppState, request: TotalsRequest) -> EngineResult<TotalsResponse> {
    let encounter = request
        .encounter
        .into_encounter(state.config().default_fee_percentage());
    let totals = state.billing().compute_totals(&encounter)?;

    let Some(code) = request.voucher_code else {
        return Ok(TotalsResponse {
            totals,
            voucher: None,
        });
    };

    let check = ValidationRequest {
        code,
        treatment_amount: totals.net_treatment_total,
        admin_fee: totals.effective_admin_fee,
        patient_id: Some(encounter.patient_id.clone()),
    };
    let validation = state.vouchers().validate(&check, state.clock().today()).await?;
    let totals = match validation.breakdown() {
        Some(breakdown) => totals.with_voucher_discount(breakdown.discount_amount),
        None => totals,
    };

    Ok(TotalsResponse {
        totals,
        voucher: Some(validation),
    })
}

/// Handler for POST /encounters.
async fn save_encounter_handler(
    State(state): State<AppState>,
    payload: Result<Json<EncounterRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing save encounter request");
    let request = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let encounter = request.into_encounter(state.config().default_fee_percentage());
    let result = state.billing().save_encounter(encounter).await;
    respond(correlation_id, "save_encounter", started, StatusCode::OK, result)
}

/// Handler for GET /encounters/:date/:id.
async fn get_encounter_handler(
    State(state): State<AppState>,
    Path((date, id)): Path<(String, String)>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let date = try_response!(parse_date(correlation_id, &date));

    let started = Instant::now();
    let result = state.billing().get_encounter(date, &id).await;
    respond(correlation_id, "get_encounter", started, StatusCode::OK, result)
}

/// Handler for POST /sitting-fees.
async fn record_sitting_fee_handler(
    State(state): State<AppState>,
    payload: Result<Json<SittingFeeRecord>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing sitting fee request");
    let record = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let result = state.billing().record_sitting_fee(record).await;
    respond(correlation_id, "record_sitting_fee", started, StatusCode::OK, result)
}

/// Handler for GET /doctor-fees/:date.
async fn doctor_fee_ledger_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let date = try_response!(parse_date(correlation_id, &date));

    let started = Instant::now();
    let result = state.billing().doctor_fee_ledger(date).await;
    respond(correlation_id, "doctor_fee_ledger", started, StatusCode::OK, result)
}

/// Handler for POST /patients.
async fn register_patient_handler(
    State(state): State<AppState>,
    payload: Result<Json<Patient>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let patient = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let result = state.billing().register_patient(patient).await;
    respond(correlation_id, "register_patient", started, StatusCode::OK, result)
}

/// Handler for POST /doctors.
async fn register_doctor_handler(
    State(state): State<AppState>,
    payload: Result<Json<Doctor>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let doctor = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let result = state.billing().register_doctor(doctor).await;
    respond(correlation_id, "register_doctor", started, StatusCode::OK, result)
}

/// Handler for POST /vouchers.
async fn create_voucher_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewVoucher>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing create voucher request");
    let new = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let result = state.vouchers().create_voucher(new, state.clock().now()).await;
    respond(correlation_id, "create_voucher", started, StatusCode::CREATED, result)
}

/// Handler for GET /vouchers.
async fn list_vouchers_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let result = state.vouchers().list_vouchers().await;
    respond(correlation_id, "list_vouchers", started, StatusCode::OK, result)
}

/// Handler for POST /voucher-validations.
///
/// A rejected voucher is a normal 200 response with `outcome: rejected`.
async fn validate_voucher_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing voucher validation request");
    let request = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let result = state.vouchers().validate(&request, state.clock().today()).await;
    respond(correlation_id, "validate_voucher", started, StatusCode::OK, result)
}

/// Handler for POST /vouchers/:id/redeem.
async fn redeem_voucher_handler(
    State(state): State<AppState>,
    Path(voucher_id): Path<String>,
    payload: Result<Json<RedemptionRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(
        correlation_id = %correlation_id,
        voucher_id = %voucher_id,
        "Processing voucher redemption request"
    );
    let request = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let result = state
        .vouchers()
        .redeem(&voucher_id, &request, state.clock().now())
        .await;
    respond(correlation_id, "redeem_voucher", started, StatusCode::CREATED, result)
}

/// Handler for POST /vouchers/:id/deactivate.
async fn deactivate_voucher_handler(
    State(state): State<AppState>,
    Path(voucher_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let result = state.vouchers().deactivate_voucher(&voucher_id).await;
    respond(correlation_id, "deactivate_voucher", started, StatusCode::OK, result)
}

/// Handler for GET /vouchers/:id/status.
async fn voucher_status_handler(
    State(state): State<AppState>,
    Path(voucher_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let result = state
        .vouchers()
        .status(&voucher_id, state.clock().today())
        .await;
    respond(correlation_id, "voucher_status", started, StatusCode::OK, result)
}

/// Handler for GET /voucher-stats.
async fn voucher_stats_handler(State(state): State<AppState>) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let result = state.vouchers().stats(state.clock().today()).await;
    respond(correlation_id, "voucher_stats", started, StatusCode::OK, result)
}

/// Handler for POST /voucher-assignments.
async fn assign_voucher_handler(
    State(state): State<AppState>,
    payload: Result<Json<AssignmentRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = try_response!(parse_body(correlation_id, payload));

    let started = Instant::now();
    let assignment = request.into_assignment(state.clock().now());
    let result = state.vouchers().assign_voucher(assignment).await;
    respond(correlation_id, "assign_voucher", started, StatusCode::CREATED, result)
}

/// Handler for GET /patients/:id/voucher-reminders.
async fn voucher_reminders_handler(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let result = state
        .vouchers()
        .patient_reminders(&patient_id, state.clock().today())
        .await;
    respond(correlation_id, "voucher_reminders", started, StatusCode::OK, result)
}
