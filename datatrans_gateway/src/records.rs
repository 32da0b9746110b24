//! Transaction outcome records.
//!
//! Every message Datatrans sends back ends up as one of three records: an [`AliasRegistration`], a [`Payment`] or a
//! [`Refund`]. A record is either a success, carrying the processor's response and authorization codes, or a failure,
//! carrying a non-empty error code. Never both. The split is enforced by [`Outcome`].
//!
//! Records are immutable once created, apart from the derived expiry date, which is recomputed from the expiry month
//! and year every time a record is about to be stored.
use std::fmt::Display;

use chrono::NaiveDate;
use dtg_common::Money;
use serde::Serialize;

use crate::errors::ProtocolError;

//--------------------------------------      Outcome       ----------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuccessDetails {
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    pub authorization_code: Option<String>,
    pub acquirer_authorization_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureDetails {
    error_code: String,
    pub error_message: Option<String>,
    pub error_detail: Option<String>,
    /// Empty when the acquirer did not report anything
    pub acquirer_error_code: String,
}

impl FailureDetails {
    pub fn new(error_code: &str) -> Result<Self, ProtocolError> {
        if error_code.is_empty() {
            return Err(ProtocolError::InvariantViolation("A failed transaction must carry an error code".into()));
        }
        Ok(Self {
            error_code: error_code.to_string(),
            error_message: None,
            error_detail: None,
            acquirer_error_code: String::new(),
        })
    }

    pub fn with_message(mut self, message: Option<String>, detail: Option<String>) -> Self {
        self.error_message = message;
        self.error_detail = detail;
        self
    }

    pub fn with_acquirer_error_code(mut self, code: Option<&str>) -> Self {
        self.acquirer_error_code = code.unwrap_or_default().to_string();
        self
    }

    pub fn error_code(&self) -> &str {
        &self.error_code
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Success(SuccessDetails),
    Failure(FailureDetails),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn success(&self) -> Option<&SuccessDetails> {
        match self {
            Self::Success(s) => Some(s),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureDetails> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f),
        }
    }
}

//--------------------------------------   Shared fields    ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionBase {
    /// Datatrans' `uppTransactionId`. Hard failures may not have one.
    pub transaction_id: Option<String>,
    pub merchant_id: String,
    pub client_ref: String,
    pub amount: Money,
    pub request_type: Option<String>,
    pub outcome: Outcome,
}

impl TransactionBase {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Card and payment method details shared by alias registrations and payments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CardDetails {
    pub payment_method: Option<String>,
    pub masked_card_number: Option<String>,
    pub card_alias: Option<String>,
    pub expiry_month: Option<u32>,
    /// Two-digit year, as Datatrans sends it
    pub expiry_year: Option<u32>,
    pub expiry_date: Option<NaiveDate>,
    pub credit_card_country: Option<String>,
}

impl CardDetails {
    /// Sets `expiry_date` to the last day of the expiry month, or clears it when month or year is unknown.
    pub fn refresh_expiry_date(&mut self) {
        self.expiry_date = match (self.expiry_month, self.expiry_year) {
            (Some(month), Some(year)) => last_day_of_month(2000 + year as i32, month),
            _ => None,
        };
    }

    /// Expiry as shown to people, e.g. `12/18`.
    pub fn expiry_display(&self) -> Option<String> {
        match (self.expiry_month, self.expiry_year) {
            (Some(month), Some(year)) => Some(format!("{month:02}/{year:02}")),
            _ => None,
        }
    }

    pub fn has_alias(&self) -> bool {
        self.card_alias.as_deref().is_some_and(|a| !a.is_empty())
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

//--------------------------------------      Records       ----------------------------------------------------------

/// The registration of a reusable card alias. These never move money, so the amount is always zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasRegistration {
    pub base: TransactionBase,
    pub card: CardDetails,
}

impl AliasRegistration {
    pub fn new(base: TransactionBase, card: CardDetails) -> Result<Self, ProtocolError> {
        if !base.amount.is_zero() {
            return Err(ProtocolError::InvariantViolation(format!(
                "Alias registrations cannot carry an amount, but {} was given",
                base.amount
            )));
        }
        Ok(Self { base, card })
    }

    /// What a charge against this alias needs. On failure, returns the name of the first missing field.
    pub fn alias_card(&self) -> Result<AliasCard<'_>, &'static str> {
        let alias = self.card.card_alias.as_deref().filter(|a| !a.is_empty()).ok_or("card alias")?;
        let expiry_month = self.card.expiry_month.ok_or("expiry month")?;
        let expiry_year = self.card.expiry_year.ok_or("expiry year")?;
        Ok(AliasCard { alias, expiry_month, expiry_year, payment_method: self.card.payment_method.as_deref() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AliasCard<'a> {
    pub alias: &'a str,
    pub expiry_month: u32,
    pub expiry_year: u32,
    pub payment_method: Option<&'a str>,
}

/// A charge, either made by the user through a payment form, or by us against a registered alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub base: TransactionBase,
    pub card: CardDetails,
}

impl Payment {
    pub fn new(base: TransactionBase, card: CardDetails) -> Self {
        Self { base, card }
    }

    /// Payments made against a registered alias echo the alias back. User-initiated ones don't.
    pub fn is_alias_payment(&self) -> bool {
        self.card.has_alias()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refund {
    pub base: TransactionBase,
    /// The `uppTransactionId` of the payment being refunded
    pub payment_transaction_id: String,
}

impl Refund {
    pub fn new(base: TransactionBase, payment_transaction_id: &str) -> Self {
        Self { base, payment_transaction_id: payment_transaction_id.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionKind {
    AliasRegistration,
    Payment,
    Refund,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AliasRegistration => f.write_str("AliasRegistration"),
            Self::Payment => f.write_str("Payment"),
            Self::Refund => f.write_str("Refund"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionRecord {
    AliasRegistration(AliasRegistration),
    Payment(Payment),
    Refund(Refund),
}

impl TransactionRecord {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::AliasRegistration(_) => TransactionKind::AliasRegistration,
            Self::Payment(_) => TransactionKind::Payment,
            Self::Refund(_) => TransactionKind::Refund,
        }
    }

    pub fn base(&self) -> &TransactionBase {
        match self {
            Self::AliasRegistration(r) => &r.base,
            Self::Payment(p) => &p.base,
            Self::Refund(r) => &r.base,
        }
    }

    pub fn card(&self) -> Option<&CardDetails> {
        match self {
            Self::AliasRegistration(r) => Some(&r.card),
            Self::Payment(p) => Some(&p.card),
            Self::Refund(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.base().is_success()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.base().transaction_id.as_deref()
    }

    pub fn client_ref(&self) -> &str {
        &self.base().client_ref
    }

    /// Recomputes derived fields. Called before every save, and idempotent.
    pub fn refresh_derived_fields(&mut self) {
        match self {
            Self::AliasRegistration(r) => r.card.refresh_expiry_date(),
            Self::Payment(p) => p.card.refresh_expiry_date(),
            Self::Refund(_) => {},
        }
    }

    pub fn event_channel(&self) -> EventChannel {
        event_channel(self)
    }
}

impl Display for TransactionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.is_success() { "successful" } else { "failed" };
        write!(f, "{} {} ({status})", self.kind(), self.transaction_id().unwrap_or("-"))
    }
}

impl From<AliasRegistration> for TransactionRecord {
    fn from(value: AliasRegistration) -> Self {
        Self::AliasRegistration(value)
    }
}

impl From<Payment> for TransactionRecord {
    fn from(value: Payment) -> Self {
        Self::Payment(value)
    }
}

impl From<Refund> for TransactionRecord {
    fn from(value: Refund) -> Self {
        Self::Refund(value)
    }
}

//--------------------------------------      Dispatch      ----------------------------------------------------------

/// The subscriber channel a stored record is announced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventChannel {
    AliasRegistrationDone,
    /// A payment the user made through the payment form
    PaymentDone,
    /// A payment we charged against a registered alias
    AliasPaymentDone,
    RefundDone,
}

/// Picks the channel for a record from its kind, and for payments, whether they were made against an alias.
///
/// Success does not influence the channel. Subscribers get both outcomes on the same channel, along with the flag.
pub fn event_channel(record: &TransactionRecord) -> EventChannel {
    match record {
        TransactionRecord::AliasRegistration(_) => EventChannel::AliasRegistrationDone,
        TransactionRecord::Payment(p) if p.is_alias_payment() => EventChannel::AliasPaymentDone,
        TransactionRecord::Payment(_) => EventChannel::PaymentDone,
        TransactionRecord::Refund(_) => EventChannel::RefundDone,
    }
}

#[cfg(test)]
mod test {
    use rust_decimal_macros::dec;

    use super::*;

    fn base(amount: Money, outcome: Outcome) -> TransactionBase {
        TransactionBase {
            transaction_id: Some("170707111922838874".into()),
            merchant_id: "1111111111".into(),
            client_ref: "1234".into(),
            amount,
            request_type: Some("CAA".into()),
            outcome,
        }
    }

    fn success() -> Outcome {
        Outcome::Success(SuccessDetails { response_code: Some("01".into()), ..Default::default() })
    }

    fn failure() -> Outcome {
        Outcome::Failure(FailureDetails::new("1403").unwrap())
    }

    fn chf(amount: rust_decimal::Decimal) -> Money {
        Money::parse(amount, "CHF").unwrap()
    }

    fn card(alias: Option<&str>) -> CardDetails {
        CardDetails {
            card_alias: alias.map(String::from),
            expiry_month: Some(12),
            expiry_year: Some(18),
            ..Default::default()
        }
    }

    #[test]
    fn failures_need_an_error_code() {
        assert!(matches!(FailureDetails::new(""), Err(ProtocolError::InvariantViolation(_))));
        let f = FailureDetails::new("-999").unwrap().with_acquirer_error_code(None);
        assert_eq!(f.error_code(), "-999");
        assert_eq!(f.acquirer_error_code, "");
        let outcome = Outcome::Failure(f);
        assert!(!outcome.is_success());
        assert!(outcome.success().is_none());
        assert_eq!(outcome.failure().map(|f| f.error_code()), Some("-999"));
    }

    #[test]
    fn alias_registrations_are_free() {
        let reg = AliasRegistration::new(base(chf(dec!(0)), success()), card(Some("70119122433810042")));
        assert!(reg.is_ok());
        let reg = AliasRegistration::new(base(chf(dec!(1)), success()), card(Some("70119122433810042")));
        assert!(matches!(reg, Err(ProtocolError::InvariantViolation(_))));
    }

    #[test]
    fn expiry_date_is_last_day_of_month() {
        let mut details = card(None);
        details.refresh_expiry_date();
        assert_eq!(details.expiry_date, NaiveDate::from_ymd_opt(2018, 12, 31));
        details.refresh_expiry_date();
        details.refresh_expiry_date();
        assert_eq!(details.expiry_date, NaiveDate::from_ymd_opt(2018, 12, 31));
        assert_eq!(details.expiry_display().as_deref(), Some("12/18"));

        details.expiry_month = Some(2);
        details.expiry_year = Some(24);
        details.refresh_expiry_date();
        assert_eq!(details.expiry_date, NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(details.expiry_display().as_deref(), Some("02/24"));

        details.expiry_year = None;
        details.refresh_expiry_date();
        assert_eq!(details.expiry_date, None);
        assert_eq!(details.expiry_display(), None);
    }

    #[test]
    fn last_day_edge_cases() {
        assert_eq!(last_day_of_month(2019, 11), NaiveDate::from_ymd_opt(2019, 11, 30));
        assert_eq!(last_day_of_month(2001, 1), NaiveDate::from_ymd_opt(2001, 1, 31));
        assert_eq!(last_day_of_month(2023, 2), NaiveDate::from_ymd_opt(2023, 2, 28));
        assert_eq!(last_day_of_month(2018, 0), None);
        assert_eq!(last_day_of_month(2018, 13), None);
    }

    #[test]
    fn refresh_through_record() {
        let mut record = TransactionRecord::from(Payment::new(base(chf(dec!(10)), success()), card(None)));
        assert_eq!(record.card().and_then(|c| c.expiry_date), None);
        record.refresh_derived_fields();
        assert_eq!(record.card().and_then(|c| c.expiry_date), NaiveDate::from_ymd_opt(2018, 12, 31));
    }

    #[test]
    fn display() {
        let record = TransactionRecord::from(Payment::new(base(chf(dec!(10)), success()), card(None)));
        assert_eq!(record.to_string(), "Payment 170707111922838874 (successful)");
        let mut refund_base = base(chf(dec!(1)), failure());
        refund_base.transaction_id = None;
        let record = TransactionRecord::from(Refund::new(refund_base, "170803184046388845"));
        assert_eq!(record.to_string(), "Refund - (failed)");
    }

    #[test]
    fn channel_for_every_combination() {
        for outcome in [success(), failure()] {
            let reg = AliasRegistration::new(base(chf(dec!(0)), outcome.clone()), card(Some("7011"))).unwrap();
            assert_eq!(event_channel(&reg.into()), EventChannel::AliasRegistrationDone);

            let user_payment = Payment::new(base(chf(dec!(10)), outcome.clone()), card(None));
            assert_eq!(event_channel(&user_payment.into()), EventChannel::PaymentDone);

            let empty_alias = Payment::new(base(chf(dec!(10)), outcome.clone()), card(Some("")));
            assert_eq!(event_channel(&empty_alias.into()), EventChannel::PaymentDone);

            let alias_payment = Payment::new(base(chf(dec!(10)), outcome.clone()), card(Some("7011")));
            assert_eq!(event_channel(&alias_payment.into()), EventChannel::AliasPaymentDone);

            let refund = Refund::new(base(chf(dec!(1)), outcome.clone()), "170803184046388845");
            let record = TransactionRecord::from(refund);
            assert_eq!(record.event_channel(), EventChannel::RefundDone);
            assert_eq!(record.is_success(), outcome.is_success());
        }
    }
}
