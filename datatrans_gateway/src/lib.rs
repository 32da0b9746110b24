//! Datatrans Gateway
//!
//! A client for the Datatrans XML payment protocol. It covers the three flows a merchant backend needs:
//! 1. The user registers a card alias, or pays, through the hosted payment form. The gateway builds the signed form
//!    parameters ([`DatatransGateway::build_payment_parameters`],
//!    [`DatatransGateway::build_register_alias_parameters`]), and Datatrans later posts a notification with the
//!    outcome ([`DatatransGateway::handle_notification`]).
//! 2. The backend charges a registered alias without the user being present ([`DatatransGateway::pay_with_alias`]).
//! 3. The backend refunds a payment, in part or in full ([`DatatransGateway::refund`]).
//!
//! Every outcome becomes a [`TransactionRecord`] that is stored through a [`TransactionStore`] implementation and then
//! announced on one of four event channels. Subscribe to them with [`EventHooks`]. Nothing here is tied to a
//! particular web framework or database.
//!
//! The lower-level pieces (request builders, response and notification parsers, the signer) are public too, for
//! callers that want to drive the protocol themselves.
mod api;
mod errors;
mod gateway;
mod xml;

pub mod config;
pub mod events;
pub mod notification;
pub mod records;
pub mod requests;
pub mod responses;
pub mod signer;
pub mod storage;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{DatatransApi, DatatransTransport, RawResponse};
pub use config::{DatatransConfig, Environment, MerchantCredentials, SigningChannel};
pub use errors::{
    notification_status,
    ConfigError,
    DatatransApiError,
    GatewayError,
    PreconditionError,
    ProtocolError,
};
pub use events::{EventHandlers, EventHooks, EventProducers, TransactionEvent};
pub use gateway::DatatransGateway;
pub use records::{
    event_channel,
    AliasRegistration,
    CardDetails,
    EventChannel,
    FailureDetails,
    Outcome,
    Payment,
    Refund,
    SuccessDetails,
    TransactionBase,
    TransactionKind,
    TransactionRecord,
};
pub use storage::{InsertTransactionResult, Stored, TransactionStore};
