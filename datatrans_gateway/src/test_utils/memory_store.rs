use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::{
    records::{AliasRegistration, Payment, TransactionRecord},
    storage::{InsertTransactionResult, Stored, TransactionStore},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryStoreError {
    #[error("The store lock was poisoned")]
    Poisoned,
}

/// A [`TransactionStore`] that keeps everything in memory. Clones share the same records.
///
/// Ids start at 1 and follow insertion order. Transaction ids are unique among successful records: a successful
/// record whose transaction id is already stored as a success is not stored again. Failed records may share a
/// transaction id, and are only skipped when an identical record is already stored.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Stored<TransactionRecord>> {
        self.records
            .read()
            .map(|records| {
                records.iter().enumerate().map(|(i, r)| Stored { id: i as i64 + 1, record: r.clone() }).collect()
            })
            .unwrap_or_default()
    }

    pub fn fetch(&self, id: i64) -> Option<TransactionRecord> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.records.read().ok()?.get(index).cloned()
    }
}

fn is_same_transaction(stored: &TransactionRecord, new: &TransactionRecord) -> bool {
    if stored == new {
        return true;
    }
    match (stored.transaction_id(), new.transaction_id()) {
        (Some(a), Some(b)) => a == b && stored.is_success() && new.is_success(),
        _ => false,
    }
}

impl TransactionStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn insert_transaction(&self, record: &TransactionRecord) -> Result<InsertTransactionResult, Self::Error> {
        let mut records = self.records.write().map_err(|_| MemoryStoreError::Poisoned)?;
        if let Some(index) = records.iter().position(|r| is_same_transaction(r, record)) {
            return Ok(InsertTransactionResult::AlreadyExists(index as i64 + 1));
        }
        records.push(record.clone());
        Ok(InsertTransactionResult::Inserted(records.len() as i64))
    }

    async fn fetch_alias_registration(&self, id: i64) -> Result<Option<AliasRegistration>, Self::Error> {
        match self.fetch(id) {
            Some(TransactionRecord::AliasRegistration(r)) => Ok(Some(r)),
            _ => Ok(None),
        }
    }

    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, Self::Error> {
        match self.fetch(id) {
            Some(TransactionRecord::Payment(p)) => Ok(Some(p)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::records::{CardDetails, FailureDetails, Outcome, Payment, SuccessDetails, TransactionBase};

    fn payment(txid: &str, outcome: Outcome) -> TransactionRecord {
        let base = TransactionBase {
            transaction_id: Some(txid.into()),
            merchant_id: "1111111111".into(),
            client_ref: "1234".into(),
            amount: dtg_common::Money::parse(dec!(1), "CHF").unwrap(),
            request_type: Some("CAA".into()),
            outcome,
        };
        Payment::new(base, CardDetails::default()).into()
    }

    fn success() -> Outcome {
        Outcome::Success(SuccessDetails { response_code: Some("01".into()), ..Default::default() })
    }

    fn declined(code: &str) -> Outcome {
        Outcome::Failure(FailureDetails::new(code).unwrap())
    }

    #[tokio::test]
    async fn successful_transaction_ids_are_unique() {
        let store = MemoryStore::new();
        let first = payment("170719094930353253", success());
        assert_eq!(store.insert_transaction(&first).await.unwrap(), InsertTransactionResult::Inserted(1));
        assert_eq!(store.insert_transaction(&first).await.unwrap(), InsertTransactionResult::AlreadyExists(1));
        let mut other = first.clone();
        if let TransactionRecord::Payment(p) = &mut other {
            p.base.client_ref = "5678".into();
        }
        assert_eq!(store.insert_transaction(&other).await.unwrap(), InsertTransactionResult::AlreadyExists(1));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn failed_records_may_share_transaction_ids() {
        let store = MemoryStore::new();
        let declined_once = payment("170720154219033737", declined("1403"));
        let declined_again = payment("170720154219033737", declined("1404"));
        assert_eq!(store.insert_transaction(&declined_once).await.unwrap(), InsertTransactionResult::Inserted(1));
        assert_eq!(store.insert_transaction(&declined_again).await.unwrap(), InsertTransactionResult::Inserted(2));
        // A redelivery of the same failure is still recognised
        assert_eq!(
            store.insert_transaction(&declined_once).await.unwrap(),
            InsertTransactionResult::AlreadyExists(1)
        );
        // A success after a failure with the same id is a different transaction outcome
        let paid = payment("170720154219033737", success());
        assert_eq!(store.insert_transaction(&paid).await.unwrap(), InsertTransactionResult::Inserted(3));
        assert_eq!(store.len(), 3);
    }
}
