//! Outbound messages: the XML bodies for alias charges and refunds, and the parameters for the hosted payment form.
use dtg_common::{CurrencyCode, Money, PLACEHOLDER_CURRENCY};
use log::*;
use serde::Serialize;

use crate::{
    config::{DatatransConfig, SigningChannel},
    errors::ProtocolError,
    records::AliasRegistration,
    signer::sign,
    xml::XmlDocument,
};

/// Alias payment methods that Datatrans needs to be told about explicitly when charging.
pub const PMETHOD_WHITELIST: [&str; 1] = ["REK"];
const ALIAS_CHARGE_REQUEST_TYPE: &str = "CAA";
const REFUND_TRANSACTION_TYPE: &str = "06";

/// Builds the `authorizationService` request that charges `amount` to a registered card alias.
pub fn build_charge_request(
    config: &DatatransConfig,
    amount: &Money,
    client_ref: &str,
    alias_registration: &AliasRegistration,
) -> Result<String, ProtocolError> {
    let card = alias_registration
        .alias_card()
        .map_err(|field| ProtocolError::InvariantViolation(format!("The alias registration has no {field}")))?;
    let credentials = config.credentials(SigningChannel::Direct);
    let merchant_id = credentials.merchant_id.as_str();
    let (minor_units, currency) = amount.to_wire()?;
    let signature = sign(&credentials.hmac_key, &[&merchant_id, &minor_units, &currency, &client_ref])?;

    let mut doc = XmlDocument::new()?;
    doc.start("authorizationService", &[("version", "3")])?
        .start("body", &[("merchantId", merchant_id)])?
        .start("transaction", &[("refno", client_ref)])?
        .start("request", &[])?
        .text_element("amount", &minor_units.to_string())?
        .text_element("currency", currency.as_str())?
        .text_element("aliasCC", card.alias)?
        .text_element("expm", &card.expiry_month.to_string())?
        .text_element("expy", &card.expiry_year.to_string())?
        .text_element("reqtype", ALIAS_CHARGE_REQUEST_TYPE)?
        .text_element("sign", &signature)?;
    if let Some(pmethod) = card.payment_method.filter(|m| PMETHOD_WHITELIST.contains(m)) {
        doc.text_element("pmethod", pmethod)?;
    }
    doc.end("request")?.end("transaction")?.end("body")?.end("authorizationService")?;
    let xml = doc.finish()?;
    trace!("💳️ Charge request: {xml}");
    Ok(xml)
}

/// Builds the `paymentService` request that refunds `amount` of the transaction `original_transaction_id`.
///
/// The merchant id must be the one the original payment was made under.
pub fn build_refund_request(
    config: &DatatransConfig,
    amount: &Money,
    client_ref: &str,
    original_transaction_id: &str,
    merchant_id: &str,
) -> Result<String, ProtocolError> {
    let key = &config.credentials(config.refund_signing_channel).hmac_key;
    let (minor_units, currency) = amount.to_wire()?;
    let signature = sign(key, &[&merchant_id, &minor_units, &currency, &client_ref])?;

    let mut doc = XmlDocument::new()?;
    doc.start("paymentService", &[("version", "1")])?
        .start("body", &[("merchantId", merchant_id)])?
        .start("transaction", &[("refno", client_ref)])?
        .start("request", &[])?
        .text_element("amount", &minor_units.to_string())?
        .text_element("currency", currency.as_str())?
        .text_element("uppTransactionId", original_transaction_id)?
        .text_element("transtype", REFUND_TRANSACTION_TYPE)?
        .text_element("sign", &signature)?
        .end("request")?
        .end("transaction")?
        .end("body")?
        .end("paymentService")?;
    let xml = doc.finish()?;
    trace!("🔁️ Refund request: {xml}");
    Ok(xml)
}

/// Everything the browser needs to show the Datatrans payment form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentParameters {
    pub merchant_id: String,
    /// In minor units
    pub amount: i64,
    pub currency: CurrencyCode,
    pub refno: String,
    pub sign: String,
    pub use_alias: bool,
}

/// Builds the signed form parameters for a payment, or with `use_alias`, for registering a card alias.
///
/// Datatrans shows no amount when registering an alias, but still wants one, so the amount becomes `0 CHF`.
pub fn build_form_parameters(
    config: &DatatransConfig,
    amount: &Money,
    client_ref: &str,
    use_alias: bool,
) -> Result<PaymentParameters, ProtocolError> {
    let credentials = config.credentials(SigningChannel::Web);
    let (amount, currency) = if use_alias { (0, PLACEHOLDER_CURRENCY) } else { amount.to_wire()? };
    let sign = sign(&credentials.hmac_key, &[&credentials.merchant_id, &amount, &currency, &client_ref])?;
    Ok(PaymentParameters {
        merchant_id: credentials.merchant_id.clone(),
        amount,
        currency,
        refno: client_ref.to_string(),
        sign,
        use_alias,
    })
}

pub fn build_payment_parameters(
    config: &DatatransConfig,
    amount: &Money,
    client_ref: &str,
) -> Result<PaymentParameters, ProtocolError> {
    build_form_parameters(config, amount, client_ref, false)
}

pub fn build_register_alias_parameters(
    config: &DatatransConfig,
    client_ref: &str,
) -> Result<PaymentParameters, ProtocolError> {
    build_form_parameters(config, &Money::zero(PLACEHOLDER_CURRENCY), client_ref, true)
}
