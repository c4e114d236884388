//! Integration tests for the clinic billing API.
//!
//! This test suite drives the HTTP router end to end:
//! - Encounter pricing and voucher-adjusted totals
//! - Directory and encounter persistence
//! - Doctor-fee reconciliation against sitting fees
//! - Voucher creation, validation, redemption, status and stats
//! - Error cases

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use clinic_billing::api::{AppState, Clock, create_router};
use clinic_billing::config::ConfigLoader;
use clinic_billing::store::MemoryStore;

// =============================================================================
// Test Helpers
// =============================================================================

fn today_instant() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-02-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn create_router_for_test() -> Router {
    let config = ConfigLoader::load("./config/clinic").expect("Failed to load config");
    let state = AppState::new(config, Arc::new(MemoryStore::new()), CancellationToken::new())
        .with_clock(Clock::Fixed(today_instant()));
    create_router(state)
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn amount(value: &Value) -> Decimal {
    match value {
        Value::String(s) => decimal(s),
        Value::Number(n) => decimal(&n.to_string()),
        other => panic!("Expected an amount, got {:?}", other),
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, "POST", uri, Some(body)).await
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, "GET", uri, None).await
}

async fn seed_directory(router: &Router) {
    let (status, _) = post(
        router,
        "/patients",
        json!({ "id": "P-001", "name": "Ana", "medical_record_number": "MRN-001" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        router,
        "/doctors",
        json!({ "id": "D-001", "name": "Dr. Budi", "specialization": "general" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn encounter(id: &str, shift: &str, line_items: Vec<Value>) -> Value {
    json!({
        "id": id,
        "patient_id": "P-001",
        "doctor_id": "D-001",
        "date": "2026-01-15",
        "shift": shift,
        "line_items": line_items,
        "fee_percentage": "40"
    })
}

fn line_item(id: &str, price: &str) -> Value {
    json!({ "id": id, "name": id, "unit_price": price })
}

async fn create_voucher(router: &Router, body: Value) -> Value {
    let (status, voucher) = post(router, "/vouchers", body).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", voucher);
    voucher
}

// =============================================================================
// Encounter Totals
// =============================================================================

#[tokio::test]
async fn test_totals_blend_medication_and_admin_fee() {
    let router = create_router_for_test();
    let body = json!({
        "patient_id": "P-001",
        "doctor_id": "D-001",
        "date": "2026-01-15",
        "shift": "morning",
        "line_items": [line_item("crown", "1000000")],
        "medications": [
            { "id": "m1", "name": "Amoxicillin", "unit_price": "15000", "quantity": 10 }
        ],
        "fee_percentage": "40",
        "admin_fee_override": "25000"
    });

    let (status, totals) = post(&router, "/encounter-totals", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&totals["net_treatment_total"]), decimal("1000000"));
    assert_eq!(amount(&totals["medication_cost"]), decimal("150000"));
    assert_eq!(amount(&totals["doctor_fee"]), decimal("400000"));
    assert_eq!(amount(&totals["grand_total"]), decimal("1175000"));
    assert!(totals["voucher"].is_null());
}

#[tokio::test]
async fn test_totals_apply_line_discounts() {
    let router = create_router_for_test();
    let body = json!({
        "patient_id": "P-001",
        "doctor_id": "D-001",
        "date": "2026-01-15",
        "shift": "morning",
        "line_items": [
            { "id": "scaling", "name": "Scaling", "unit_price": "200000",
              "discount_mode": "percentage", "discount_input": "10" },
            { "id": "xray", "name": "X-ray", "unit_price": "50000",
              "discount_mode": "fixed", "discount_input": "70000" }
        ]
    });

    let (status, totals) = post(&router, "/encounter-totals", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&totals["subtotal"]), decimal("250000"));
    assert_eq!(amount(&totals["total_discount"]), decimal("70000"));
    assert_eq!(amount(&totals["net_treatment_total"]), decimal("180000"));
    // Clinic defaults: 25,000 admin fee and 40% doctor share
    assert_eq!(amount(&totals["effective_admin_fee"]), decimal("25000"));
    assert_eq!(amount(&totals["doctor_fee"]), decimal("72000"));
    assert_eq!(amount(&totals["grand_total"]), decimal("205000"));

    let steps = totals["audit_trace"]["steps"].as_array().unwrap();
    assert!(steps.iter().any(|s| s["rule_id"] == "line_discount"));
    assert!(steps.iter().any(|s| s["rule_id"] == "doctor_fee"));
}

#[tokio::test]
async fn test_totals_with_voucher_discount_treatment_only() {
    let router = create_router_for_test();
    create_voucher(
        &router,
        json!({ "code": "SMILE20", "discount_type": "percentage",
                "discount_value": "20", "max_discount": "50000" }),
    )
    .await;

    let mut body = encounter("E-1", "morning", vec![line_item("crown", "1000000")]);
    body["voucher_code"] = json!("smile20");
    let (status, totals) = post(&router, "/encounter-totals", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals["voucher"]["outcome"], "valid");
    assert_eq!(amount(&totals["voucher_discount"]), decimal("50000"));
    // 1,000,000 - 50,000 + 25,000 admin fee
    assert_eq!(amount(&totals["grand_total"]), decimal("975000"));
    // Doctor fee stays on the pre-voucher net
    assert_eq!(amount(&totals["doctor_fee"]), decimal("400000"));
}

#[tokio::test]
async fn test_totals_reject_fee_percentage_over_100() {
    let router = create_router_for_test();
    let mut body = encounter("E-1", "morning", vec![line_item("crown", "1000")]);
    body["fee_percentage"] = json!("140");

    let (status, error) = post(&router, "/encounter-totals", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_ENCOUNTER");
}

#[tokio::test]
async fn test_totals_reject_price_above_limit() {
    let router = create_router_for_test();
    let body = encounter(
        "E-1",
        "morning",
        vec![line_item("implant", "79228162514264337593543950335")],
    );

    let (status, error) = post(&router, "/encounter-totals", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_LINE_ITEM");
}

// =============================================================================
// Encounters and Doctor Fees
// =============================================================================

#[tokio::test]
async fn test_moving_encounter_date_leaves_one_ledger_entry() {
    let router = create_router_for_test();
    seed_directory(&router).await;

    post(&router, "/encounters", encounter("E-1", "morning", vec![line_item("crown", "1000000")])).await;
    let mut moved = encounter("E-1", "morning", vec![line_item("crown", "1000000")]);
    moved["date"] = json!("2026-01-16");
    let (status, _) = post(&router, "/encounters", moved).await;
    assert_eq!(status, StatusCode::OK);

    let (_, old_day) = get(&router, "/doctor-fees/2026-01-15").await;
    assert!(old_day.as_array().unwrap().is_empty());

    let (_, new_day) = get(&router, "/doctor-fees/2026-01-16").await;
    let entries = new_day.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(amount(&entries[0]["payable_fee"]), decimal("400000"));

    let (status, _) = get(&router, "/encounters/2026-01-15/E-1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_save_and_fetch_encounter() {
    let router = create_router_for_test();
    seed_directory(&router).await;

    let (status, saved) = post(
        &router,
        "/encounters",
        encounter("E-1", "morning", vec![line_item("filling", "300000")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["id"], "E-1");

    let (status, fetched) = get(&router, "/encounters/2026-01-15/E-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["patient_id"], "P-001");
    assert_eq!(fetched["shift"], "morning");
}

#[tokio::test]
async fn test_save_encounter_unknown_patient_is_404() {
    let router = create_router_for_test();

    let (status, error) = post(
        &router,
        "/encounters",
        encounter("E-1", "morning", vec![line_item("filling", "300000")]),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "PATIENT_NOT_FOUND");
}

#[tokio::test]
async fn test_missing_encounter_is_404() {
    let router = create_router_for_test();
    let (status, error) = get(&router, "/encounters/2026-01-15/E-404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "ENCOUNTER_NOT_FOUND");
}

#[tokio::test]
async fn test_sitting_fee_floor_with_no_encounters() {
    let router = create_router_for_test();
    seed_directory(&router).await;

    let (status, _) = post(
        &router,
        "/sitting-fees",
        json!({ "doctor_id": "D-001", "shift": "evening", "date": "2026-01-15", "amount": "100000" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, ledger) = get(&router, "/doctor-fees/2026-01-15").await;
    assert_eq!(status, StatusCode::OK);

    let entries = ledger.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["shift"], "evening");
    assert_eq!(entries[0]["encounter_count"], 0);
    assert_eq!(amount(&entries[0]["payable_fee"]), decimal("100000"));
    assert_eq!(entries[0]["sitting_fee_applied"], true);
}

#[tokio::test]
async fn test_computed_fee_above_sitting_fee_is_paid() {
    let router = create_router_for_test();
    seed_directory(&router).await;

    post(
        &router,
        "/sitting-fees",
        json!({ "doctor_id": "D-001", "shift": "morning", "date": "2026-01-15", "amount": "150000" }),
    )
    .await;
    post(&router, "/encounters", encounter("E-1", "morning", vec![line_item("crown", "500000")])).await;
    post(&router, "/encounters", encounter("E-2", "morning", vec![line_item("crown", "500000")])).await;

    let (_, ledger) = get(&router, "/doctor-fees/2026-01-15").await;
    let entry = &ledger.as_array().unwrap()[0];

    assert_eq!(entry["encounter_count"], 2);
    assert_eq!(amount(&entry["computed_fee"]), decimal("400000"));
    assert_eq!(amount(&entry["payable_fee"]), decimal("400000"));
    assert_eq!(entry["sitting_fee_applied"], false);
}

#[tokio::test]
async fn test_ledger_invalid_date_is_400() {
    let router = create_router_for_test();
    let (status, error) = get(&router, "/doctor-fees/15-01-2026").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

// =============================================================================
// Vouchers
// =============================================================================

#[tokio::test]
async fn test_duplicate_voucher_code_is_409() {
    let router = create_router_for_test();
    let body = json!({ "code": "NEW50", "discount_type": "fixed", "discount_value": "50000" });
    create_voucher(&router, body.clone()).await;

    let mut lower = body;
    lower["code"] = json!("new50");
    let (status, error) = post(&router, "/vouchers", lower).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["code"], "DUPLICATE_VOUCHER_CODE");
}

#[tokio::test]
async fn test_validation_caps_percentage_discount() {
    let router = create_router_for_test();
    create_voucher(
        &router,
        json!({ "code": "SMILE20", "discount_type": "percentage",
                "discount_value": "20", "max_discount": "50000" }),
    )
    .await;

    let (status, result) = post(
        &router,
        "/voucher-validations",
        json!({ "code": "SMILE20", "treatment_amount": "1000000", "admin_fee": "25000" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["outcome"], "valid");
    assert_eq!(amount(&result["breakdown"]["discount_amount"]), decimal("50000"));
    assert_eq!(amount(&result["breakdown"]["final_total_amount"]), decimal("975000"));
}

#[tokio::test]
async fn test_below_minimum_ignores_admin_fee() {
    let router = create_router_for_test();
    create_voucher(
        &router,
        json!({ "code": "BIG500", "discount_type": "fixed",
                "discount_value": "50000", "min_amount": "500000" }),
    )
    .await;

    let (status, result) = post(
        &router,
        "/voucher-validations",
        json!({ "code": "BIG500", "treatment_amount": "400000", "admin_fee": "200000" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["outcome"], "rejected");
    assert_eq!(result["reason"]["kind"], "below_minimum");
    assert!(result["message"].as_str().unwrap().contains("excluding admin fee"));
}

#[tokio::test]
async fn test_expired_voucher_is_rejected() {
    let router = create_router_for_test();
    create_voucher(
        &router,
        json!({ "code": "JANUARY", "discount_type": "fixed",
                "discount_value": "10000", "expiry_date": "2026-01-31" }),
    )
    .await;

    let (_, result) = post(
        &router,
        "/voucher-validations",
        json!({ "code": "january", "treatment_amount": "100000" }),
    )
    .await;

    assert_eq!(result["outcome"], "rejected");
    assert_eq!(result["reason"]["kind"], "expired");
}

#[tokio::test]
async fn test_redeem_then_status_and_stats() {
    let router = create_router_for_test();
    seed_directory(&router).await;
    let voucher = create_voucher(
        &router,
        json!({ "code": "ONCE", "discount_type": "fixed",
                "discount_value": "50000", "usage_limit": 1 }),
    )
    .await;
    let id = voucher["id"].as_str().unwrap();

    let redemption = json!({
        "patient_id": "P-001",
        "treatment_amount": "300000",
        "admin_fee": "25000",
        "used_by": "frontdesk"
    });
    let (status, record) = post(&router, &format!("/vouchers/{id}/redeem"), redemption.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(amount(&record["usage_record"]["final_total_amount"]), decimal("275000"));
    assert_eq!(record["updated_voucher"]["current_usage"], 1);

    let (status, error) = post(&router, &format!("/vouchers/{id}/redeem"), redemption).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "VOUCHER_USAGE_LIMIT_REACHED");

    let (_, status_report) = get(&router, &format!("/vouchers/{id}/status")).await;
    assert_eq!(status_report["status"], "used");
    assert_eq!(status_report["status_text"], "Used");

    let (_, stats) = get(&router, "/voucher-stats").await;
    assert_eq!(stats["total_vouchers"], 1);
    assert_eq!(stats["total_redemptions"], 1);
    assert_eq!(amount(&stats["average_discount"]), decimal("50000"));
}

#[tokio::test]
async fn test_deactivated_voucher_reports_inactive() {
    let router = create_router_for_test();
    let voucher = create_voucher(
        &router,
        json!({ "code": "STOPME", "discount_type": "fixed", "discount_value": "1000" }),
    )
    .await;
    let id = voucher["id"].as_str().unwrap();

    let (status, _) = send(&router, "POST", &format!("/vouchers/{id}/deactivate"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, report) = get(&router, &format!("/vouchers/{id}/status")).await;
    assert_eq!(report["status"], "inactive");

    let (_, result) = post(
        &router,
        "/voucher-validations",
        json!({ "code": "STOPME", "treatment_amount": "100000" }),
    )
    .await;
    assert_eq!(result["reason"]["kind"], "not_found");
}

#[tokio::test]
async fn test_assignment_reminders() {
    let router = create_router_for_test();
    seed_directory(&router).await;
    let voucher = create_voucher(
        &router,
        json!({ "code": "BDAY", "discount_type": "percentage",
                "discount_value": "10", "expiry_date": "2026-02-11" }),
    )
    .await;

    let (status, _) = post(
        &router,
        "/voucher-assignments",
        json!({ "voucher_id": voucher["id"], "patient_id": "P-001", "note": "Birthday" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, reminders) = get(&router, "/patients/P-001/voucher-reminders").await;
    assert_eq!(status, StatusCode::OK);
    let reminders = reminders.as_array().unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0]["days_until_expiry"], 10);
    assert_eq!(reminders[0]["redeemed_by_recipient"], false);
}

#[tokio::test]
async fn test_redeem_unknown_voucher_is_404() {
    let router = create_router_for_test();
    seed_directory(&router).await;

    let (status, error) = post(
        &router,
        "/vouchers/nope/redeem",
        json!({ "patient_id": "P-001", "treatment_amount": "1000", "used_by": "frontdesk" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["code"], "VOUCHER_NOT_FOUND");
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_malformed_json_is_400() {
    let router = create_router_for_test();
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/encounter-totals")
                .header("Content-Type", "application/json")
                .body(Body::from("{ not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["code"], "MALFORMED_JSON");
}

#[tokio::test]
async fn test_missing_field_is_validation_error() {
    let router = create_router_for_test();
    let (status, error) = post(&router, "/voucher-validations", json!({ "code": "X" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_content_type() {
    let router = create_router_for_test();
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/vouchers")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["code"], "MISSING_CONTENT_TYPE");
}
