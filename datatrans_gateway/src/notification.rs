//! Parsing of the server-to-server notifications Datatrans posts once a form has been completed.
//!
//! Alias registrations and payments arrive on the same endpoint. Registrations are recognised by the `useAlias`
//! user parameter being exactly `true`. Successful notifications are authenticated with the `sign2` parameter, a web
//! key signature over the merchant id, the amount and currency as sent, and the transaction id. Failed ones carry no
//! signature at all.
use dtg_common::Secret;
use log::*;

use crate::{
    errors::ProtocolError,
    records::{AliasRegistration, CardDetails, Outcome, Payment, TransactionBase, TransactionRecord},
    responses::{failure_details, parse_expiry_month, parse_expiry_year, parse_money, success_details, Envelope},
    signer::verify,
    xml::XmlElement,
};

static NO_PARAMETERS: XmlElement = XmlElement::empty();

/// Parses a notification into an [`AliasRegistration`] or a [`Payment`] record.
///
/// A successful notification whose `sign2` is missing or wrong is rejected with a security failure (see
/// [`ProtocolError::is_security_failure`]) and no record is produced.
pub fn parse_notification(xml: &str, web_key: &Secret<Vec<u8>>) -> Result<TransactionRecord, ProtocolError> {
    trace!("📨️ Notification: {xml}");
    let root = XmlElement::parse(xml)?;
    let envelope = Envelope::open(&root)?;
    let transaction = envelope.transaction;
    let params = transaction.child("userParameters").unwrap_or(&NO_PARAMETERS);
    let transaction_id = transaction.required_text("uppTransactionId")?.to_string();
    let is_success = transaction.attr("status") == Some("success");

    let outcome = if is_success {
        let amount = transaction.required_text("amount")?;
        let currency = transaction.required_text("currency")?;
        let sign2 = params.parameter("sign2").ok_or_else(|| ProtocolError::MissingSignature(transaction_id.clone()))?;
        if !verify(sign2, web_key, &[&envelope.merchant_id, &amount, &currency, &transaction_id])? {
            warn!("📨️ Rejecting notification for transaction {transaction_id}. The sign2 signature does not match.");
            return Err(ProtocolError::SignatureMismatch(transaction_id));
        }
        Outcome::Success(success_details(transaction.required_child("success")?)?)
    } else {
        let error = transaction.required_child("error")?;
        Outcome::Failure(failure_details(error, params.parameter("acqErrorCode"))?)
    };

    let mut card = CardDetails {
        payment_method: transaction.optional_string("pmethod"),
        expiry_month: parse_expiry_month(params.parameter("expm"))?,
        expiry_year: parse_expiry_year(params.parameter("expy"))?,
        credit_card_country: params.parameter("returnCustomerCountry").map(String::from),
        ..Default::default()
    };
    let base = TransactionBase {
        transaction_id: Some(transaction_id),
        merchant_id: envelope.merchant_id,
        client_ref: envelope.client_ref,
        amount: parse_money(transaction)?,
        request_type: transaction.optional_string("reqtype"),
        outcome,
    };

    let record = if params.parameter("useAlias") == Some("true") {
        card.masked_card_number = params.parameter("maskedCC").map(String::from);
        card.card_alias = params.parameter("aliasCC").map(String::from);
        AliasRegistration::new(base, card)?.into()
    } else {
        if is_success {
            card.masked_card_number = params.parameter("cardno").map(String::from);
        }
        Payment::new(base, card).into()
    };
    debug!("📨️ Parsed notification: {record}");
    Ok(record)
}
