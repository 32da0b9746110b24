//! Parsing of the synchronous responses to alias charges and refunds.
//!
//! Datatrans echoes the request back inside the response, so the amount, alias and expiry are read from the
//! reflected `request` element. The outcome is a success only when `body@status` is `accepted` *and*
//! `transaction@trxStatus` is `response`. Anything else is read from the `error` block.
use dtg_common::Money;
use log::*;

use crate::{
    errors::ProtocolError,
    records::{CardDetails, FailureDetails, Outcome, Payment, Refund, SuccessDetails, TransactionBase},
    xml::XmlElement,
};

/// The parts every Datatrans message shares: the `body` and `transaction` elements.
pub(crate) struct Envelope<'a> {
    pub body: &'a XmlElement,
    pub transaction: &'a XmlElement,
    pub merchant_id: String,
    pub client_ref: String,
}

impl<'a> Envelope<'a> {
    pub fn open(root: &'a XmlElement) -> Result<Self, ProtocolError> {
        let body = root.required_child("body")?;
        let transaction = body.required_child("transaction")?;
        let merchant_id = body.required_attr("merchantId")?.to_string();
        let client_ref = transaction.required_attr("refno")?.to_string();
        Ok(Self { body, transaction, merchant_id, client_ref })
    }

    fn is_accepted(&self) -> bool {
        self.body.attr("status") == Some("accepted") && self.transaction.attr("trxStatus") == Some("response")
    }
}

pub(crate) fn parse_money(element: &XmlElement) -> Result<Money, ProtocolError> {
    let amount = element.required_text("amount")?;
    let currency = element.required_text("currency")?;
    Ok(Money::from_wire(amount, currency)?)
}

pub(crate) fn parse_expiry_month(text: Option<&str>) -> Result<Option<u32>, ProtocolError> {
    parse_bounded(text, "expiry month", 1, 12)
}

pub(crate) fn parse_expiry_year(text: Option<&str>) -> Result<Option<u32>, ProtocolError> {
    parse_bounded(text, "expiry year", 0, 99)
}

fn parse_bounded(text: Option<&str>, field: &str, min: u32, max: u32) -> Result<Option<u32>, ProtocolError> {
    let Some(text) = text else {
        return Ok(None);
    };
    match text.trim().parse::<u32>() {
        Ok(v) if (min..=max).contains(&v) => Ok(Some(v)),
        _ => Err(ProtocolError::InvalidValue { field: field.to_string(), value: text.to_string() }),
    }
}

/// Reads the codes of a success block. The `responseCode` element must be present, although it may be empty, and
/// at least one of the codes must have a value.
pub(crate) fn success_details(success: &XmlElement) -> Result<SuccessDetails, ProtocolError> {
    success.required_child("responseCode")?;
    let details = SuccessDetails {
        response_code: success.optional_string("responseCode"),
        response_message: success.optional_string("responseMessage"),
        authorization_code: success.optional_string("authorizationCode"),
        acquirer_authorization_code: success.optional_string("acqAuthorizationCode"),
    };
    if details == SuccessDetails::default() {
        return Err(ProtocolError::InvariantViolation(format!(
            "The <{}> block of a successful transaction carries no response or authorization codes",
            success.name()
        )));
    }
    Ok(details)
}

pub(crate) fn failure_details(
    error: &XmlElement,
    acquirer_error_code: Option<&str>,
) -> Result<FailureDetails, ProtocolError> {
    let details = FailureDetails::new(error.required_text("errorCode")?)?
        .with_message(error.optional_string("errorMessage"), error.optional_string("errorDetail"))
        .with_acquirer_error_code(acquirer_error_code);
    Ok(details)
}

/// Parses the response to an alias charge (`authorizationService`) into a [`Payment`].
pub fn parse_charge_response(xml: &str) -> Result<Payment, ProtocolError> {
    trace!("💳️ Charge response: {xml}");
    let root = XmlElement::parse(xml)?;
    let envelope = Envelope::open(&root)?;
    let request = envelope.transaction.required_child("request")?;
    let mut card = CardDetails {
        card_alias: request.optional_string("aliasCC"),
        expiry_month: parse_expiry_month(request.optional_text("expm"))?,
        expiry_year: parse_expiry_year(request.optional_text("expy"))?,
        ..Default::default()
    };
    let (transaction_id, outcome) = if envelope.is_accepted() {
        let response = envelope.transaction.required_child("response")?;
        card.masked_card_number = response.optional_string("maskedCC");
        card.credit_card_country = response.optional_string("returnCustomerCountry");
        let details = success_details(response)?;
        (Some(response.required_text("uppTransactionId")?.to_string()), Outcome::Success(details))
    } else {
        let error = envelope.transaction.required_child("error")?;
        card.credit_card_country = error.optional_string("returnCustomerCountry");
        let failure = failure_details(error, error.optional_text("acqErrorCode"))?;
        (error.optional_string("uppTransactionId"), Outcome::Failure(failure))
    };
    let base = TransactionBase {
        transaction_id,
        merchant_id: envelope.merchant_id,
        client_ref: envelope.client_ref,
        amount: parse_money(request)?,
        request_type: request.optional_string("reqtype"),
        outcome,
    };
    Ok(Payment::new(base, card))
}

/// Parses the response to a refund request (`paymentService`) into a [`Refund`].
pub fn parse_refund_response(xml: &str) -> Result<Refund, ProtocolError> {
    trace!("🔁️ Refund response: {xml}");
    let root = XmlElement::parse(xml)?;
    let envelope = Envelope::open(&root)?;
    let request = envelope.transaction.required_child("request")?;
    let payment_transaction_id = request.required_text("uppTransactionId")?;
    let (transaction_id, outcome) = if envelope.is_accepted() {
        let response = envelope.transaction.required_child("response")?;
        let details = success_details(response)?;
        (Some(response.required_text("uppTransactionId")?.to_string()), Outcome::Success(details))
    } else {
        let error = envelope.transaction.required_child("error")?;
        let failure = failure_details(error, error.optional_text("acqErrorCode"))?;
        (error.optional_string("uppTransactionId"), Outcome::Failure(failure))
    };
    let base = TransactionBase {
        transaction_id,
        merchant_id: envelope.merchant_id,
        client_ref: envelope.client_ref,
        amount: parse_money(request)?,
        request_type: request.optional_string("reqtype"),
        outcome,
    };
    Ok(Refund::new(base, payment_transaction_id))
}
