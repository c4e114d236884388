//! Typed access to clinic records in a [`KeyValueStore`].

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Doctor, Patient, SittingFeeRecord, TreatmentEncounter, Voucher, VoucherAssignment,
    VoucherUsageRecord,
};

use super::{KeyValueStore, Precondition, RetryPolicy, VersionedValue, WriteOp};

/// Key layout.
pub mod keys {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::models::ClinicShift;

    /// `patients/{id}`
    pub fn patient(id: &str) -> String {
        format!("patients/{id}")
    }

    /// `doctors/{id}`
    pub fn doctor(id: &str) -> String {
        format!("doctors/{id}")
    }

    /// All vouchers.
    pub const VOUCHERS: &str = "vouchers/";

    /// `vouchers/{id}`
    pub fn voucher(id: &str) -> String {
        format!("{VOUCHERS}{id}")
    }

    /// `voucher_codes/{CODE}`, the uniqueness index from code to voucher id.
    pub fn voucher_code(normalized_code: &str) -> String {
        format!("voucher_codes/{normalized_code}")
    }

    /// All usage records.
    pub const VOUCHER_USAGES: &str = "voucher_usages/";

    /// Usage records of one voucher.
    pub fn voucher_usages(voucher_id: &str) -> String {
        format!("{VOUCHER_USAGES}{voucher_id}/")
    }

    /// `voucher_usages/{voucher_id}/{usage_id}`
    pub fn voucher_usage(voucher_id: &str, usage_id: Uuid) -> String {
        format!("{VOUCHER_USAGES}{voucher_id}/{usage_id}")
    }

    /// Assignments of one patient.
    pub fn voucher_assignments(patient_id: &str) -> String {
        format!("voucher_assignments/{patient_id}/")
    }

    /// `voucher_assignments/{patient_id}/{voucher_id}`
    pub fn voucher_assignment(patient_id: &str, voucher_id: &str) -> String {
        format!("voucher_assignments/{patient_id}/{voucher_id}")
    }

    /// Encounters on one date.
    pub fn encounters(date: NaiveDate) -> String {
        format!("encounters/{date}/")
    }

    /// `encounters/{date}/{id}`
    pub fn encounter(date: NaiveDate, id: &str) -> String {
        format!("encounters/{date}/{id}")
    }

    /// `encounter_dates/{id}`, the index from encounter id to its current date.
    pub fn encounter_date(id: &str) -> String {
        format!("encounter_dates/{id}")
    }

    /// Sitting fees on one date.
    pub fn sitting_fees(date: NaiveDate) -> String {
        format!("sitting_fees/{date}/")
    }

    /// `sitting_fees/{date}/{doctor_id}/{shift}`
    pub fn sitting_fee(date: NaiveDate, doctor_id: &str, shift: ClinicShift) -> String {
        format!("sitting_fees/{date}/{doctor_id}/{}", shift.as_str())
    }
}

/// A decoded record with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// The record.
    pub value: T,
    /// Store version, for optimistic concurrency.
    pub version: u64,
}

/// Typed reads and writes of clinic records.
///
/// Every store call goes through the repository's [`RetryPolicy`] and is
/// abandoned when the shutdown token fires.
#[derive(Clone)]
pub struct ClinicRepository {
    store: Arc<dyn KeyValueStore>,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

impl ClinicRepository {
    /// Creates a repository over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, retry: RetryPolicy, shutdown: CancellationToken) -> Self {
        Self {
            store,
            retry,
            shutdown,
        }
    }

    /// Builds a write of `value` to `key`.
    pub fn put_op<T: Serialize>(
        key: String,
        value: &T,
        precondition: Precondition,
    ) -> EngineResult<WriteOp> {
        let value = serde_json::to_value(value).map_err(|e| EngineError::Persistence {
            message: format!("failed to encode record for '{key}': {e}"),
        })?;
        Ok(WriteOp::Put {
            key,
            value,
            precondition,
        })
    }

    /// Builds a removal of `key`.
    pub fn delete_op(key: String, precondition: Precondition) -> WriteOp {
        WriteOp::Delete { key, precondition }
    }

    /// Reads and decodes one record.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> EngineResult<Option<Versioned<T>>> {
        let store = &self.store;
        let found = self
            .retry
            .run("get", &self.shutdown, || store.get(key))
            .await?;
        found.map(|stored| decode(key, stored)).transpose()
    }

    /// Reads and decodes every record under `prefix`, in key order.
    pub async fn list<T: DeserializeOwned>(&self, prefix: &str) -> EngineResult<Vec<T>> {
        let store = &self.store;
        let entries = self
            .retry
            .run("list", &self.shutdown, || store.list(prefix))
            .await?;
        entries
            .into_iter()
            .map(|(key, stored)| decode(&key, stored).map(|v| v.value))
            .collect()
    }

    /// Commits `ops` atomically.
    ///
    /// A failed precondition surfaces as [`EngineError::WriteConflict`].
    pub async fn commit(&self, ops: Vec<WriteOp>) -> EngineResult<()> {
        let store = &self.store;
        self.retry
            .run("commit", &self.shutdown, || store.commit(ops.clone()))
            .await
    }

    /// Writes one record unconditionally.
    pub async fn put<T: Serialize>(&self, key: String, value: &T) -> EngineResult<()> {
        self.commit(vec![Self::put_op(key, value, Precondition::None)?]).await
    }

    /// Looks up a patient.
    pub async fn patient(&self, id: &str) -> EngineResult<Option<Patient>> {
        Ok(self.get(&keys::patient(id)).await?.map(|v| v.value))
    }

    /// Creates or replaces a patient.
    pub async fn put_patient(&self, patient: &Patient) -> EngineResult<()> {
        self.put(keys::patient(&patient.id), patient).await
    }

    /// Looks up a doctor.
    pub async fn doctor(&self, id: &str) -> EngineResult<Option<Doctor>> {
        Ok(self.get(&keys::doctor(id)).await?.map(|v| v.value))
    }

    /// Creates or replaces a doctor.
    pub async fn put_doctor(&self, doctor: &Doctor) -> EngineResult<()> {
        self.put(keys::doctor(&doctor.id), doctor).await
    }

    /// Reads a voucher with its version.
    pub async fn voucher(&self, id: &str) -> EngineResult<Option<Versioned<Voucher>>> {
        self.get(&keys::voucher(id)).await
    }

    /// Resolves a normalised code to a voucher id.
    pub async fn voucher_id_for_code(&self, normalized_code: &str) -> EngineResult<Option<String>> {
        Ok(self
            .get::<String>(&keys::voucher_code(normalized_code))
            .await?
            .map(|v| v.value))
    }

    /// Lists every voucher.
    pub async fn vouchers(&self) -> EngineResult<Vec<Voucher>> {
        self.list(keys::VOUCHERS).await
    }

    /// Lists one voucher's usage records.
    pub async fn voucher_usages(&self, voucher_id: &str) -> EngineResult<Vec<VoucherUsageRecord>> {
        self.list(&keys::voucher_usages(voucher_id)).await
    }

    /// Lists every usage record.
    pub async fn all_voucher_usages(&self) -> EngineResult<Vec<VoucherUsageRecord>> {
        self.list(keys::VOUCHER_USAGES).await
    }

    /// Creates or replaces an assignment.
    pub async fn put_assignment(&self, assignment: &VoucherAssignment) -> EngineResult<()> {
        let key = keys::voucher_assignment(&assignment.patient_id, &assignment.voucher_id);
        self.put(key, assignment).await
    }

    /// Lists one patient's assignments.
    pub async fn assignments_for(&self, patient_id: &str) -> EngineResult<Vec<VoucherAssignment>> {
        self.list(&keys::voucher_assignments(patient_id)).await
    }

    /// Reads the date an encounter is currently filed under.
    pub async fn encounter_date(&self, id: &str) -> EngineResult<Option<Versioned<NaiveDate>>> {
        self.get(&keys::encounter_date(id)).await
    }

    /// Builds the batch that files `encounter` under its date.
    ///
    /// `indexed` is the index entry read beforehand. The index write is
    /// conditioned on it, and a record filed under an earlier date is
    /// removed in the same batch.
    pub fn encounter_ops(
        encounter: &TreatmentEncounter,
        indexed: Option<&Versioned<NaiveDate>>,
    ) -> EngineResult<Vec<WriteOp>> {
        let index_precondition = match indexed {
            Some(entry) => Precondition::Version(entry.version),
            None => Precondition::Absent,
        };

        let mut ops = vec![
            Self::put_op(
                keys::encounter(encounter.date, &encounter.id),
                encounter,
                Precondition::None,
            )?,
            Self::put_op(
                keys::encounter_date(&encounter.id),
                &encounter.date,
                index_precondition,
            )?,
        ];
        if let Some(previous) = indexed.filter(|entry| entry.value != encounter.date) {
            ops.push(Self::delete_op(
                keys::encounter(previous.value, &encounter.id),
                Precondition::None,
            ));
        }
        Ok(ops)
    }

    /// Looks up an encounter.
    pub async fn encounter(&self, date: NaiveDate, id: &str) -> EngineResult<Option<TreatmentEncounter>> {
        Ok(self.get(&keys::encounter(date, id)).await?.map(|v| v.value))
    }

    /// Lists encounters on a date.
    pub async fn encounters_on(&self, date: NaiveDate) -> EngineResult<Vec<TreatmentEncounter>> {
        self.list(&keys::encounters(date)).await
    }

    /// Creates or replaces a sitting fee.
    pub async fn put_sitting_fee(&self, record: &SittingFeeRecord) -> EngineResult<()> {
        let key = keys::sitting_fee(record.date, &record.doctor_id, record.shift);
        self.put(key, record).await
    }

    /// Lists sitting fees on a date.
    pub async fn sitting_fees_on(&self, date: NaiveDate) -> EngineResult<Vec<SittingFeeRecord>> {
        self.list(&keys::sitting_fees(date)).await
    }
}

fn decode<T: DeserializeOwned>(key: &str, stored: VersionedValue) -> EngineResult<Versioned<T>> {
    let value = serde_json::from_value(stored.value).map_err(|e| EngineError::Persistence {
        message: format!("corrupt record at '{key}': {e}"),
    })?;
    Ok(Versioned {
        value,
        version: stored.version,
    })
}
