use serde::Serialize;

use crate::records::{AliasRegistration, Payment, TransactionRecord};

/// A record together with the id the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stored<T> {
    pub id: i64,
    pub record: T,
}

/// The outcome of storing a record. `AlreadyExists` carries the id of the record that was stored before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertTransactionResult {
    Inserted(i64),
    AlreadyExists(i64),
}

impl InsertTransactionResult {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::AlreadyExists(id) => *id,
        }
    }
}

/// This trait defines what the gateway needs from whatever persists transaction records.
///
/// Records are only ever inserted, never updated or deleted. Datatrans may deliver the same notification more than
/// once. Which records count as the same is up to the implementation, but a redelivery must be reported as
/// [`InsertTransactionResult::AlreadyExists`] rather than as an error. Errors are for the store being unavailable,
/// and make the notification endpoint ask Datatrans to try again later.
#[allow(async_fn_in_trait)]
pub trait TransactionStore: Clone {
    type Error: std::error::Error;

    /// Stores a new record, unless it has been stored already.
    async fn insert_transaction(&self, record: &TransactionRecord) -> Result<InsertTransactionResult, Self::Error>;

    /// Fetches the alias registration with the given id, if there is one.
    async fn fetch_alias_registration(&self, id: i64) -> Result<Option<AliasRegistration>, Self::Error>;

    /// Fetches the payment with the given id, if there is one.
    async fn fetch_payment(&self, id: i64) -> Result<Option<Payment>, Self::Error>;
}
