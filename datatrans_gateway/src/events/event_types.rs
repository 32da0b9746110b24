use serde::Serialize;

use crate::records::{EventChannel, TransactionRecord};

/// Announces a transaction record that has just been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionEvent {
    pub channel: EventChannel,
    /// The id the record was stored under
    pub id: i64,
    pub record: TransactionRecord,
    pub success: bool,
    pub client_ref: String,
}

impl TransactionEvent {
    pub fn new(id: i64, record: TransactionRecord) -> Self {
        let channel = record.event_channel();
        let success = record.is_success();
        let client_ref = record.client_ref().to_string();
        Self { channel, id, record, success, client_ref }
    }
}
