use dtg_common::{CurrencyCode, Money, MoneyError};
use thiserror::Error;

/// Anything wrong with a payload received from (or built for) Datatrans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Malformed XML: {0}")]
    Xml(String),
    #[error("Missing <{0}> element")]
    MissingElement(String),
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: String },
    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },
    #[error("Invalid amount. {0}")]
    InvalidMoney(#[from] MoneyError),
    #[error("The notification for transaction {0} carries no sign2 signature")]
    MissingSignature(String),
    #[error("The sign2 signature for transaction {0} does not match")]
    SignatureMismatch(String),
    #[error("Payload violates a transaction invariant. {0}")]
    InvariantViolation(String),
}

impl ProtocolError {
    /// True for failures that mean the payload could not be authenticated, as opposed to being malformed.
    pub fn is_security_failure(&self) -> bool {
        matches!(self, Self::MissingSignature(_) | Self::SignatureMismatch(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatatransApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("Could not complete request to {url}. {message}")]
    Transport { url: String, message: String },
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

/// Caller-side mistakes, caught before anything is sent to Datatrans.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("The amount must be positive, but was {0}")]
    NonPositiveAmount(Money),
    #[error("Cannot refund in {refund} a payment made in {payment}")]
    CurrencyMismatch { refund: CurrencyCode, payment: CurrencyCode },
    #[error("Cannot refund {refund}. The original payment was only {payment}")]
    AmountExceedsOriginal { refund: Money, payment: Money },
    #[error("Payment #{0} did not succeed, so it cannot be refunded")]
    UnsuccessfulPayment(i64),
    #[error("Payment #{0} has no Datatrans transaction id")]
    MissingTransactionId(i64),
    #[error("Alias registration #{0} did not succeed")]
    UnsuccessfulAliasRegistration(i64),
    #[error("Alias registration #{id} has no {field}")]
    IncompleteAliasRegistration { id: i64, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingValue(String),
    #[error("Invalid value for {name}. {reason}")]
    InvalidValue { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Configuration error. {0}")]
    Config(#[from] ConfigError),
    #[error("Request rejected. {0}")]
    Precondition(#[from] PreconditionError),
    #[error("Protocol error. {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Datatrans API error. {0}")]
    Api(#[from] DatatransApiError),
    #[error("Storage error. {0}")]
    StorageError(String),
    #[error("Alias registration #{0} does not exist")]
    AliasRegistrationNotFound(i64),
    #[error("Payment #{0} does not exist")]
    PaymentNotFound(i64),
}

impl GatewayError {
    /// The HTTP status the notification endpoint should answer with when handling a notification failed.
    ///
    /// Unauthenticated payloads get 403 and malformed ones 400. Everything else is on our side, and a 500 asks
    /// Datatrans to deliver the notification again later.
    pub fn notification_status(&self) -> u16 {
        match self {
            Self::Protocol(e) if e.is_security_failure() => 403,
            Self::Protocol(_) => 400,
            _ => 500,
        }
    }
}

/// Maps the outcome of [`crate::DatatransGateway::handle_notification`] onto an HTTP status code.
///
/// Declined transactions are still successfully handled notifications, and are answered with 200.
pub fn notification_status<T>(result: &Result<T, GatewayError>) -> u16 {
    match result {
        Ok(_) => 200,
        Err(e) => e.notification_status(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn security_failures() {
        assert!(ProtocolError::MissingSignature("1".into()).is_security_failure());
        assert!(ProtocolError::SignatureMismatch("1".into()).is_security_failure());
        assert!(!ProtocolError::MissingElement("amount".into()).is_security_failure());
        assert!(!ProtocolError::Xml("eof".into()).is_security_failure());
    }

    #[test]
    fn notification_statuses() {
        let ok: Result<(), GatewayError> = Ok(());
        assert_eq!(notification_status(&ok), 200);
        let bad_sig: Result<(), GatewayError> = Err(ProtocolError::SignatureMismatch("1".into()).into());
        assert_eq!(notification_status(&bad_sig), 403);
        let malformed: Result<(), GatewayError> = Err(ProtocolError::MissingElement("body".into()).into());
        assert_eq!(notification_status(&malformed), 400);
        let storage: Result<(), GatewayError> = Err(GatewayError::StorageError("disk full".into()));
        assert_eq!(notification_status(&storage), 500);
    }
}
