//! Encounter billing, sitting fees and the doctor-fee ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Doctor, DoctorFeeLedgerEntry, EncounterTotals, Patient, SittingFeeRecord, TreatmentEncounter,
};
use crate::money::{MAX_AMOUNT, within_limit};
use crate::pricing::{encounter_totals, reconcile_doctor_fees, validate_encounter};
use crate::store::{ClinicRepository, keys};

const ENCOUNTER_WRITE_ATTEMPTS: u32 = 3;

/// Prices encounters and reconciles doctor fees against stored records.
#[derive(Clone)]
pub struct BillingService {
    repo: ClinicRepository,
    default_admin_fee: Decimal,
}

impl BillingService {
    /// Creates a billing service charging `default_admin_fee` when an
    /// encounter has no override.
    pub fn new(repo: ClinicRepository, default_admin_fee: Decimal) -> Self {
        Self {
            repo,
            default_admin_fee,
        }
    }

    /// The clinic-wide admin fee.
    pub fn default_admin_fee(&self) -> Decimal {
        self.default_admin_fee
    }

    /// Prices an encounter without saving it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLineItem` or `InvalidEncounter` for out-of-range input.
    pub fn compute_totals(&self, encounter: &TreatmentEncounter) -> EngineResult<EncounterTotals> {
        validate_encounter(encounter)?;
        Ok(encounter_totals(encounter, self.default_admin_fee))
    }

    /// Saves an encounter, replacing any previous version with the same id.
    ///
    /// The patient and doctor must exist in the directory. If the edit moves
    /// the encounter to another date, the record under the old date is
    /// removed in the same commit.
    pub async fn save_encounter(&self, encounter: TreatmentEncounter) -> EngineResult<TreatmentEncounter> {
        validate_encounter(&encounter)?;
        self.require_patient(&encounter.patient_id).await?;
        self.require_doctor(&encounter.doctor_id).await?;

        for attempt in 1..=ENCOUNTER_WRITE_ATTEMPTS {
            let indexed = self.repo.encounter_date(&encounter.id).await?;
            let ops = ClinicRepository::encounter_ops(&encounter, indexed.as_ref())?;

            match self.repo.commit(ops).await {
                Ok(()) => {
                    info!(
                        encounter_id = %encounter.id,
                        patient_id = %encounter.patient_id,
                        doctor_id = %encounter.doctor_id,
                        date = %encounter.date,
                        previous_date = ?indexed.as_ref().map(|entry| entry.value),
                        shift = %encounter.shift,
                        "Encounter saved"
                    );
                    return Ok(encounter);
                }
                Err(EngineError::WriteConflict { key }) => {
                    warn!(
                        encounter_id = %encounter.id,
                        key = %key,
                        attempt = attempt,
                        "Encounter edited concurrently, re-reading"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(EngineError::WriteConflict {
            key: keys::encounter_date(&encounter.id),
        })
    }

    /// Fetches a saved encounter.
    pub async fn get_encounter(&self, date: NaiveDate, id: &str) -> EngineResult<TreatmentEncounter> {
        self.repo
            .encounter(date, id)
            .await?
            .ok_or_else(|| EngineError::not_found("encounter", id))
    }

    /// Records the sitting fee for a (doctor, shift, date), replacing any
    /// earlier amount.
    pub async fn record_sitting_fee(&self, record: SittingFeeRecord) -> EngineResult<SittingFeeRecord> {
        if record.amount.is_sign_negative() {
            return Err(EngineError::invalid_input(
                "sitting fee amount",
                format!("must not be negative, got {}", record.amount),
            ));
        }
        require_within_limit("sitting fee amount", record.amount)?;
        self.require_doctor(&record.doctor_id).await?;

        self.repo.put_sitting_fee(&record).await?;
        info!(key = %record.key(), amount = %record.amount, "Sitting fee recorded");
        Ok(record)
    }

    /// Reconciles doctor fees for every shift on `date`.
    ///
    /// Encounters and sitting fees are read fresh on every call.
    pub async fn doctor_fee_ledger(&self, date: NaiveDate) -> EngineResult<Vec<DoctorFeeLedgerEntry>> {
        let encounters = self.repo.encounters_on(date).await?;
        let sitting_fees = self.repo.sitting_fees_on(date).await?;
        debug!(
            date = %date,
            encounters = encounters.len(),
            sitting_fees = sitting_fees.len(),
            "Reconciling doctor fees"
        );

        Ok(reconcile_doctor_fees(&encounters, &sitting_fees)
            .into_values()
            .collect())
    }

    /// Creates or replaces a patient.
    pub async fn register_patient(&self, patient: Patient) -> EngineResult<Patient> {
        require_non_empty("patient id", &patient.id)?;
        self.repo.put_patient(&patient).await?;
        Ok(patient)
    }

    /// Creates or replaces a doctor.
    pub async fn register_doctor(&self, doctor: Doctor) -> EngineResult<Doctor> {
        require_non_empty("doctor id", &doctor.id)?;
        self.repo.put_doctor(&doctor).await?;
        Ok(doctor)
    }

    async fn require_patient(&self, id: &str) -> EngineResult<Patient> {
        self.repo
            .patient(id)
            .await?
            .ok_or_else(|| EngineError::not_found("patient", id))
    }

    async fn require_doctor(&self, id: &str) -> EngineResult<Doctor> {
        self.repo
            .doctor(id)
            .await?
            .ok_or_else(|| EngineError::not_found("doctor", id))
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> EngineResult<()> {
    if value.trim().is_empty() {
        return Err(EngineError::invalid_input(field, "must not be empty"));
    }
    Ok(())
}

pub(crate) fn require_within_limit(field: &str, amount: Decimal) -> EngineResult<()> {
    if !within_limit(amount) {
        return Err(EngineError::invalid_input(
            field,
            format!("must not exceed {}, got {}", MAX_AMOUNT, amount),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClinicShift, MedicationLineItem, TreatmentLineItem};
    use crate::store::{MemoryStore, RetryPolicy};
    use std::str::FromStr;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn service() -> BillingService {
        let repo = ClinicRepository::new(
            Arc::new(MemoryStore::new()),
            RetryPolicy::immediate(3),
            CancellationToken::new(),
        );
        BillingService::new(repo, dec("25000"))
    }

    async fn seeded() -> BillingService {
        let service = service();
        service
            .register_patient(Patient {
                id: "P-001".to_string(),
                name: "Ana".to_string(),
                medical_record_number: "MRN-001".to_string(),
            })
            .await
            .unwrap();
        service
            .register_doctor(Doctor {
                id: "D-001".to_string(),
                name: "Dr. Budi".to_string(),
                specialization: "orthodontics".to_string(),
            })
            .await
            .unwrap();
        service
    }

    fn encounter(id: &str, shift: ClinicShift, price: &str) -> TreatmentEncounter {
        TreatmentEncounter {
            id: id.to_string(),
            patient_id: "P-001".to_string(),
            doctor_id: "D-001".to_string(),
            date: date(),
            shift,
            line_items: vec![TreatmentLineItem::new("t1", "Filling", dec(price))],
            medications: vec![],
            fee_percentage: dec("40"),
            admin_fee_override: None,
        }
    }

    #[test]
    fn test_compute_totals_uses_default_admin_fee() {
        let mut enc = encounter("E-1", ClinicShift::Morning, "1000000");
        enc.medications = vec![MedicationLineItem {
            id: "m1".to_string(),
            name: "Amoxicillin".to_string(),
            unit_price: dec("15000"),
            quantity: 10,
        }];

        let totals = service().compute_totals(&enc).unwrap();
        assert_eq!(totals.effective_admin_fee, dec("25000"));
        assert_eq!(totals.doctor_fee, dec("400000"));
        assert_eq!(totals.grand_total, dec("1175000"));
    }

    #[test]
    fn test_compute_totals_rejects_out_of_range_fee() {
        let mut enc = encounter("E-1", ClinicShift::Morning, "1000");
        enc.fee_percentage = dec("120");
        assert!(matches!(
            service().compute_totals(&enc),
            Err(EngineError::InvalidEncounter { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_encounter_requires_known_patient() {
        let service = service();
        let result = service
            .save_encounter(encounter("E-1", ClinicShift::Morning, "1000"))
            .await;
        assert!(matches!(result, Err(EngineError::NotFound { ref entity, .. }) if entity == "patient"));
    }

    #[tokio::test]
    async fn test_save_is_full_replace() {
        let service = seeded().await;
        service
            .save_encounter(encounter("E-1", ClinicShift::Morning, "1000"))
            .await
            .unwrap();
        service
            .save_encounter(encounter("E-1", ClinicShift::Morning, "2000"))
            .await
            .unwrap();

        let saved = service.get_encounter(date(), "E-1").await.unwrap();
        assert_eq!(saved.line_items[0].unit_price, dec("2000"));
    }

    #[tokio::test]
    async fn test_moving_encounter_to_another_date_bills_it_once() {
        let service = seeded().await;
        let next_day = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();

        service
            .save_encounter(encounter("E-1", ClinicShift::Morning, "1000000"))
            .await
            .unwrap();
        let mut moved = encounter("E-1", ClinicShift::Morning, "1000000");
        moved.date = next_day;
        service.save_encounter(moved).await.unwrap();

        assert!(service.doctor_fee_ledger(date()).await.unwrap().is_empty());
        let ledger = service.doctor_fee_ledger(next_day).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].encounter_count, 1);
        assert_eq!(ledger[0].payable_fee, dec("400000"));

        assert!(matches!(
            service.get_encounter(date(), "E-1").await,
            Err(EngineError::NotFound { .. })
        ));
        assert_eq!(service.get_encounter(next_day, "E-1").await.unwrap().date, next_day);
    }

    #[tokio::test]
    async fn test_resave_after_lost_ack_keeps_one_record() {
        let store = Arc::new(MemoryStore::new());
        let repo = ClinicRepository::new(store.clone(), RetryPolicy::immediate(3), CancellationToken::new());
        let service = BillingService::new(repo, dec("25000"));
        service
            .register_patient(Patient {
                id: "P-001".to_string(),
                name: "Ana".to_string(),
                medical_record_number: "MRN-001".to_string(),
            })
            .await
            .unwrap();
        service
            .register_doctor(Doctor {
                id: "D-001".to_string(),
                name: "Dr. Budi".to_string(),
                specialization: String::new(),
            })
            .await
            .unwrap();

        store.lose_next_acks(1);
        service
            .save_encounter(encounter("E-1", ClinicShift::Evening, "500000"))
            .await
            .unwrap();

        let ledger = service.doctor_fee_ledger(date()).await.unwrap();
        assert_eq!(ledger[0].encounter_count, 1);
    }

    #[tokio::test]
    async fn test_sitting_fee_above_limit_rejected() {
        let service = seeded().await;
        let result = service
            .record_sitting_fee(SittingFeeRecord {
                doctor_id: "D-001".to_string(),
                shift: ClinicShift::Morning,
                date: date(),
                amount: Decimal::MAX,
            })
            .await;
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_ledger_applies_sitting_fee_floor_without_encounters() {
        let service = seeded().await;
        service
            .record_sitting_fee(SittingFeeRecord {
                doctor_id: "D-001".to_string(),
                shift: ClinicShift::Evening,
                date: date(),
                amount: dec("100000"),
            })
            .await
            .unwrap();

        let ledger = service.doctor_fee_ledger(date()).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].encounter_count, 0);
        assert_eq!(ledger[0].payable_fee, dec("100000"));
    }

    #[tokio::test]
    async fn test_ledger_reflects_new_encounters_immediately() {
        let service = seeded().await;
        service
            .record_sitting_fee(SittingFeeRecord {
                doctor_id: "D-001".to_string(),
                shift: ClinicShift::Morning,
                date: date(),
                amount: dec("100000"),
            })
            .await
            .unwrap();

        let before = service.doctor_fee_ledger(date()).await.unwrap();
        assert_eq!(before[0].payable_fee, dec("100000"));

        service
            .save_encounter(encounter("E-1", ClinicShift::Morning, "1000000"))
            .await
            .unwrap();

        let after = service.doctor_fee_ledger(date()).await.unwrap();
        assert_eq!(after[0].computed_fee, dec("400000"));
        assert_eq!(after[0].payable_fee, dec("400000"));
    }

    #[tokio::test]
    async fn test_negative_sitting_fee_rejected() {
        let service = seeded().await;
        let result = service
            .record_sitting_fee(SittingFeeRecord {
                doctor_id: "D-001".to_string(),
                shift: ClinicShift::Morning,
                date: date(),
                amount: dec("-1"),
            })
            .await;
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }
}
