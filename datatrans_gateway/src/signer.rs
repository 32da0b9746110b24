//! HMAC-SHA256 signatures over Datatrans protocol fields.
//!
//! Datatrans signs the plain concatenation of a handful of fields, with no separators, and exchanges the digest as
//! lowercase hex. Which fields, and in which order, depends on the message:
//!
//! | Message                     | Key    | Fields                                            |
//! |-----------------------------|--------|---------------------------------------------------|
//! | Payment / registration form | web    | merchant id, amount, currency, refno              |
//! | Alias charge                | direct | merchant id, amount, currency, refno              |
//! | Refund                      | config | merchant id, amount, currency, refno              |
//! | Notification (`sign2`)      | web    | merchant id, amount, currency, uppTransactionId   |
use std::fmt::Display;

use dtg_common::Secret;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::errors::ProtocolError;

type HmacSha256 = Hmac<Sha256>;

fn mac_over(key: &Secret<Vec<u8>>, fields: &[&dyn Display]) -> Result<HmacSha256, ProtocolError> {
    let mut mac = HmacSha256::new_from_slice(key.reveal())
        .map_err(|e| ProtocolError::InvalidValue { field: "HMAC key".into(), value: e.to_string() })?;
    let message = fields.iter().map(|f| f.to_string()).collect::<String>();
    trace!("🔐️ Signing '{message}' with a {} byte key", key.len());
    mac.update(message.as_bytes());
    Ok(mac)
}

/// Returns the lowercase hex HMAC-SHA256 digest of the concatenated fields.
pub fn sign(key: &Secret<Vec<u8>>, fields: &[&dyn Display]) -> Result<String, ProtocolError> {
    let mac = mac_over(key, fields)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a hex digest received from Datatrans against the one computed locally. The comparison is constant-time.
///
/// Anything that is not valid hex simply does not match.
pub fn verify(expected: &str, key: &Secret<Vec<u8>>, fields: &[&dyn Display]) -> Result<bool, ProtocolError> {
    let mac = mac_over(key, fields)?;
    let Ok(expected) = hex::decode(expected.trim()) else {
        debug!("🔐️ The signature received is not valid hex");
        return Ok(false);
    };
    Ok(mac.verify_slice(&expected).is_ok())
}

#[cfg(test)]
mod test {
    use super::*;

    fn web_key() -> Secret<Vec<u8>> {
        Secret::new(vec![0xaa; 64])
    }

    fn mpo_key() -> Secret<Vec<u8>> {
        Secret::new(vec![0xbb; 64])
    }

    #[test]
    fn known_digests() {
        let sig = sign(&mpo_key(), &[&"2222222222", &12300, &"CHF", &"abcdef"]).unwrap();
        assert_eq!(sig, "4c1324f4708a8b07310b47089a0041724b0155067e0ffb37ceb3b00d3a24d067");
        let sig = sign(&web_key(), &[&"1111111111", &850, &"CHF", &"91827364"]).unwrap();
        assert_eq!(sig, "afdd2eef36dd6f39222ee6c3bb641c9731817508068f3e807c21adb3fe483d04");
        let sig = sign(&web_key(), &[&"1234567", &12300, &"CHF", &"abcdef"]).unwrap();
        assert_eq!(sig, "cae361426f625bbe03a9ef0ef3c4daf27a7e16547191ec7b704cb1337d43fe22");
    }

    #[test]
    fn fields_are_concatenated_without_separators() {
        let split = sign(&web_key(), &[&"11111", &"11111", &0, &"CHF"]).unwrap();
        let joined = sign(&web_key(), &[&"1111111111", &"0CHF"]).unwrap();
        assert_eq!(split, joined);
    }

    #[test]
    fn any_change_alters_the_digest() {
        let fields: [&dyn Display; 4] = [&"1111111111", &850, &"CHF", &"91827364"];
        let base = sign(&web_key(), &fields).unwrap();
        assert_ne!(base, sign(&web_key(), &[&"1111111112", &850, &"CHF", &"91827364"]).unwrap());
        assert_ne!(base, sign(&web_key(), &[&"1111111111", &851, &"CHF", &"91827364"]).unwrap());
        assert_ne!(base, sign(&web_key(), &[&"1111111111", &850, &"EUR", &"91827364"]).unwrap());
        assert_ne!(base, sign(&web_key(), &[&"1111111111", &850, &"CHF", &"91827365"]).unwrap());
        assert_ne!(base, sign(&mpo_key(), &fields).unwrap());
    }

    #[test]
    fn verify_round_trip() {
        let fields: [&dyn Display; 4] = [&"1111111111", &"0", &"CHF", &"170707111922838874"];
        let sig = sign(&web_key(), &fields).unwrap();
        assert_eq!(sig, "6b8f6adfe37bf8ab331e7576563395647c59350270b4d38b60aa4903f9018030");
        assert!(verify(&sig, &web_key(), &fields).unwrap());
        assert!(!verify(&sig, &mpo_key(), &fields).unwrap());
        assert!(!verify("somethingcompletelydifferent", &web_key(), &fields).unwrap());
        assert!(!verify("", &web_key(), &fields).unwrap());
        assert!(!verify(&sig[..62], &web_key(), &fields).unwrap());
    }
}
