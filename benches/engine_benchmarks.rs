//! Performance benchmarks for the clinic billing engine.
//!
//! Covers the pure pricing rules and the HTTP path for encounter totals:
//! - Totals for a single encounter
//! - Doctor-fee reconciliation across a busy day
//! - Voucher validation against a large voucher list
//! - End-to-end `/encounter-totals` requests
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use clinic_billing::api::{AppState, create_router};
use clinic_billing::config::ConfigLoader;
use clinic_billing::models::{
    ClinicShift, DiscountMode, DiscountType, MedicationLineItem, SittingFeeRecord,
    TreatmentEncounter, TreatmentLineItem, Voucher,
};
use clinic_billing::pricing::{aggregate_encounter_totals, reconcile_doctor_fees};
use clinic_billing::store::MemoryStore;
use clinic_billing::voucher::{ValidationRequest, validate_voucher};

use axum::{body::Body, http::Request};
use tower::ServiceExt;

fn bench_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

fn line_items(count: usize) -> Vec<TreatmentLineItem> {
    (0..count)
        .map(|i| {
            let item = TreatmentLineItem::new(
                format!("tx_{:03}", i),
                "Procedure",
                Decimal::from(150_000 + (i as i64) * 25_000),
            );
            if i % 2 == 0 {
                item.with_discount(DiscountMode::Percentage, Decimal::from(10))
            } else {
                item.with_discount(DiscountMode::Fixed, Decimal::from(20_000))
            }
        })
        .collect()
}

fn medications(count: usize) -> Vec<MedicationLineItem> {
    (0..count)
        .map(|i| MedicationLineItem {
            id: format!("med_{:03}", i),
            name: "Amoxicillin".to_string(),
            unit_price: Decimal::from(15_000),
            quantity: 2,
        })
        .collect()
}

fn encounters(count: usize) -> Vec<TreatmentEncounter> {
    let shifts = [ClinicShift::Morning, ClinicShift::Afternoon, ClinicShift::Evening];
    (0..count)
        .map(|i| TreatmentEncounter {
            id: format!("E-{:04}", i),
            patient_id: format!("P-{:04}", i),
            doctor_id: format!("D-{:02}", i % 8),
            date: bench_date(),
            shift: shifts[i % shifts.len()],
            line_items: line_items(3),
            medications: medications(1),
            fee_percentage: Decimal::from(40),
            admin_fee_override: None,
        })
        .collect()
}

fn sitting_fees() -> Vec<SittingFeeRecord> {
    (0..8)
        .flat_map(|doctor| {
            [ClinicShift::Morning, ClinicShift::Afternoon, ClinicShift::Evening]
                .into_iter()
                .map(move |shift| SittingFeeRecord {
                    doctor_id: format!("D-{:02}", doctor),
                    shift,
                    date: bench_date(),
                    amount: Decimal::from(150_000),
                })
        })
        .collect()
}

fn vouchers(count: usize) -> Vec<Voucher> {
    (0..count)
        .map(|i| Voucher {
            id: format!("v-{:04}", i),
            code: format!("PROMO{:04}", i),
            description: String::new(),
            is_active: true,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(15),
            max_discount: Some(Decimal::from(100_000)),
            min_amount: Some(Decimal::from(200_000)),
            min_purchase: None,
            expiry_date: None,
            usage_limit: Some(100),
            current_usage: 0,
            created_at: Utc::now(),
        })
        .collect()
}

/// Benchmark: Totals for a single encounter with ten procedures.
fn bench_encounter_totals(c: &mut Criterion) {
    let items = line_items(10);
    let meds = medications(3);

    c.bench_function("encounter_totals", |b| {
        b.iter(|| {
            black_box(aggregate_encounter_totals(
                black_box(&items),
                black_box(&meds),
                Decimal::from(40),
                None,
                Decimal::from(25_000),
            ))
        })
    });
}

/// Benchmark: Reconciling a day's encounters against sitting fees.
fn bench_reconciliation(c: &mut Criterion) {
    let fees = sitting_fees();
    let mut group = c.benchmark_group("doctor_fee_reconciliation");

    for count in [10usize, 100, 1000] {
        let day = encounters(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("encounters", count), &day, |b, day| {
            b.iter(|| black_box(reconcile_doctor_fees(day, &fees)))
        });
    }

    group.finish();
}

/// Benchmark: Looking up and validating a code among many vouchers.
fn bench_voucher_validation(c: &mut Criterion) {
    let catalog = vouchers(1000);
    let request = ValidationRequest {
        code: "promo0999".to_string(),
        treatment_amount: Decimal::from(750_000),
        admin_fee: Decimal::from(25_000),
        patient_id: None,
    };

    c.bench_function("voucher_validation_1000", |b| {
        b.iter(|| black_box(validate_voucher(&request, &catalog, &[], bench_date(), 1)))
    });
}

/// Benchmark: The `/encounter-totals` endpoint end to end.
fn bench_totals_endpoint(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = ConfigLoader::load("./config/clinic").expect("Failed to load config");
    let state = AppState::new(config, Arc::new(MemoryStore::new()), CancellationToken::new());
    let router = create_router(state);

    let body = serde_json::json!({
        "patient_id": "P-001",
        "doctor_id": "D-001",
        "date": "2026-01-15",
        "shift": "morning",
        "line_items": line_items(5),
        "medications": medications(2)
    })
    .to_string();

    c.bench_function("encounter_totals_endpoint", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/encounter-totals")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

criterion_group!(
    benches,
    bench_encounter_totals,
    bench_reconciliation,
    bench_voucher_validation,
    bench_totals_endpoint,
);
criterion_main!(benches);
