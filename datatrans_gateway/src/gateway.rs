use std::fmt::Debug;

use dtg_common::Money;
use log::*;

use crate::{
    api::{DatatransTransport, RawResponse},
    config::DatatransConfig,
    errors::{DatatransApiError, GatewayError, PreconditionError, ProtocolError},
    events::{EventProducers, TransactionEvent},
    notification::parse_notification,
    records::{Payment, Refund, TransactionRecord},
    requests::{self, build_charge_request, build_refund_request, PaymentParameters},
    responses::{parse_charge_response, parse_refund_response},
    storage::{InsertTransactionResult, Stored, TransactionStore},
};

/// `DatatransGateway` is the primary API for charging, refunding and handling Datatrans notifications.
///
/// Every operation that produces a transaction record stores it and then announces it on the matching event channel,
/// exactly once. Nothing is announced if storing fails, or if the store already had the record. Requests are checked
/// before they are sent, and never retried.
pub struct DatatransGateway<B, T> {
    config: DatatransConfig,
    db: B,
    transport: T,
    producers: EventProducers,
}

impl<B, T> Debug for DatatransGateway<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DatatransGateway")
    }
}

impl<B, T> DatatransGateway<B, T> {
    pub fn new(config: DatatransConfig, db: B, transport: T, producers: EventProducers) -> Self {
        Self { config, db, transport, producers }
    }

    pub fn config(&self) -> &DatatransConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Parameters for the hosted payment form, signed with the web key.
    pub fn build_payment_parameters(
        &self,
        amount: &Money,
        client_ref: &str,
    ) -> Result<PaymentParameters, GatewayError> {
        let parameters = requests::build_payment_parameters(&self.config, amount, client_ref)?;
        info!("💳️ Built payment parameters for {client_ref}: {parameters:?}");
        Ok(parameters)
    }

    /// Parameters for the hosted form that registers a card alias. No amount is shown to the user.
    pub fn build_register_alias_parameters(&self, client_ref: &str) -> Result<PaymentParameters, GatewayError> {
        let parameters = requests::build_register_alias_parameters(&self.config, client_ref)?;
        info!("💳️ Built alias registration parameters for {client_ref}: {parameters:?}");
        Ok(parameters)
    }
}

impl<B, T> DatatransGateway<B, T>
where
    B: TransactionStore,
    T: DatatransTransport,
{
    /// Charges `amount` to the card registered by the alias registration with the given id.
    ///
    /// The amount must be positive, and the alias registration must have succeeded and carry an alias and expiry date.
    /// A declined charge is not an error: it is returned (and stored) as an unsuccessful payment.
    pub async fn pay_with_alias(
        &self,
        amount: Money,
        alias_registration_id: i64,
        client_ref: &str,
    ) -> Result<Stored<Payment>, GatewayError> {
        if !amount.is_positive() {
            return Err(PreconditionError::NonPositiveAmount(amount).into());
        }
        let registration = self
            .db
            .fetch_alias_registration(alias_registration_id)
            .await
            .map_err(storage_error)?
            .ok_or(GatewayError::AliasRegistrationNotFound(alias_registration_id))?;
        if !registration.base.is_success() {
            return Err(PreconditionError::UnsuccessfulAliasRegistration(alias_registration_id).into());
        }
        if let Err(field) = registration.alias_card() {
            return Err(PreconditionError::IncompleteAliasRegistration { id: alias_registration_id, field }.into());
        }
        info!("💳️ Charging {amount} to alias registration #{alias_registration_id} for {client_ref}");
        let request = build_charge_request(&self.config, &amount, client_ref, &registration)?;
        let response = self.transport.authorize(request).await?;
        let mut payment = parse_response(response, parse_charge_response)?;
        payment.card.refresh_expiry_date();
        let id = self.save_and_notify(payment.clone().into()).await?;
        info!("💳️ Alias payment #{id} for {client_ref} done. {}", TransactionRecord::from(payment.clone()));
        Ok(Stored { id, record: payment })
    }

    /// Refunds `amount` of the payment with the given id, in part or in full.
    ///
    /// The refund must be positive, in the same currency as the payment and no larger than it, and the payment must
    /// have succeeded. Its reference is the payment's reference with `-r` appended.
    pub async fn refund(&self, amount: Money, payment_id: i64) -> Result<Stored<Refund>, GatewayError> {
        if !amount.is_positive() {
            return Err(PreconditionError::NonPositiveAmount(amount).into());
        }
        let payment = self
            .db
            .fetch_payment(payment_id)
            .await
            .map_err(storage_error)?
            .ok_or(GatewayError::PaymentNotFound(payment_id))?;
        check_refundable(&amount, payment_id, &payment)?;
        let transaction_id =
            payment.base.transaction_id.as_deref().ok_or(PreconditionError::MissingTransactionId(payment_id))?;
        let client_ref = format!("{}-r", payment.base.client_ref);
        info!("🔁️ Refunding {amount} of payment #{payment_id} ({transaction_id}, {})", payment.base.amount);
        let request =
            build_refund_request(&self.config, &amount, &client_ref, transaction_id, &payment.base.merchant_id)?;
        let response = self.transport.process(request).await?;
        let refund = parse_response(response, parse_refund_response)?;
        let id = self.save_and_notify(refund.clone().into()).await?;
        info!("🔁️ Refund #{id} for payment #{payment_id} done. {}", TransactionRecord::from(refund.clone()));
        Ok(Stored { id, record: refund })
    }

    /// Handles the body of a notification posted by Datatrans.
    ///
    /// Use [`crate::notification_status`] to turn the result into the HTTP status to answer with.
    pub async fn handle_notification(&self, xml: &str) -> Result<Stored<TransactionRecord>, GatewayError> {
        let record = parse_notification(xml, &self.config.web.hmac_key).map_err(|e| {
            if e.is_security_failure() {
                warn!("📨️ Ignoring unauthenticated notification. {e}");
            } else {
                warn!("📨️ Ignoring malformed notification. {e}");
            }
            e
        })?;
        debug!("📨️ Processing notification: {record}");
        self.process_event(record).await
    }

    /// Stores a record and announces it to subscribers. The derived fields are recomputed first.
    pub async fn process_event(
        &self,
        mut record: TransactionRecord,
    ) -> Result<Stored<TransactionRecord>, GatewayError> {
        record.refresh_derived_fields();
        let id = self.save_and_notify(record.clone()).await?;
        Ok(Stored { id, record })
    }

    async fn save_and_notify(&self, mut record: TransactionRecord) -> Result<i64, GatewayError> {
        record.refresh_derived_fields();
        let result = self.db.insert_transaction(&record).await.map_err(|e| {
            error!("Could not store {record}. {e}");
            storage_error(e)
        })?;
        match result {
            InsertTransactionResult::Inserted(id) => {
                debug!("Stored {record} as #{id}");
                self.producers.notify(TransactionEvent::new(id, record)).await;
                Ok(id)
            },
            InsertTransactionResult::AlreadyExists(id) => {
                info!("{record} was already stored as #{id}. Subscribers are not notified again.");
                Ok(id)
            },
        }
    }
}

fn check_refundable(amount: &Money, payment_id: i64, payment: &Payment) -> Result<(), PreconditionError> {
    let original = payment.base.amount;
    if !payment.base.is_success() {
        return Err(PreconditionError::UnsuccessfulPayment(payment_id));
    }
    if amount.currency() != original.currency() {
        return Err(PreconditionError::CurrencyMismatch { refund: amount.currency(), payment: original.currency() });
    }
    if amount.amount() > original.amount() {
        return Err(PreconditionError::AmountExceedsOriginal { refund: *amount, payment: original });
    }
    Ok(())
}

/// Parses a response body. A body that cannot be parsed out of a non-success response is a transport failure,
/// not a protocol one.
fn parse_response<R>(response: RawResponse, parse: fn(&str) -> Result<R, ProtocolError>) -> Result<R, GatewayError> {
    match parse(&response.body) {
        Ok(record) => Ok(record),
        Err(e) if !response.is_success() => {
            debug!("Could not parse the error response. {e}");
            Err(DatatransApiError::QueryError { status: response.status, message: response.body }.into())
        },
        Err(e) => Err(e.into()),
    }
}

fn storage_error<E: std::error::Error>(e: E) -> GatewayError {
    GatewayError::StorageError(e.to_string())
}
