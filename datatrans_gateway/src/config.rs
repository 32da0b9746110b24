use std::{env, time::Duration};

use dtg_common::{helpers::parse_choice, Secret};
use log::*;

use crate::errors::ConfigError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SANDBOX_BASE_URL: &str = "https://pilot.datatrans.biz/";
const PRODUCTION_BASE_URL: &str = "https://payment.datatrans.biz/";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

/// Datatrans hands out a separate merchant id and signing key for each of its API surfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SigningChannel {
    /// Browser redirects: payment forms, alias registration forms and the notifications they produce.
    #[default]
    Web,
    /// Server-to-server calls (also known as "mpo").
    Direct,
}

#[derive(Clone, Debug, Default)]
pub struct MerchantCredentials {
    pub merchant_id: String,
    pub hmac_key: Secret<Vec<u8>>,
}

impl MerchantCredentials {
    pub fn new(merchant_id: &str, hmac_key: Vec<u8>) -> Self {
        Self { merchant_id: merchant_id.to_string(), hmac_key: Secret::new(hmac_key) }
    }

    /// Reads a merchant id and a hex-encoded key from the given environment variables.
    pub fn try_from_env(merchant_var: &str, key_var: &str) -> Result<Self, ConfigError> {
        let merchant_id = env::var(merchant_var).map_err(|_| ConfigError::MissingValue(merchant_var.to_string()))?;
        let hex_key = env::var(key_var).map_err(|_| ConfigError::MissingValue(key_var.to_string()))?;
        let hmac_key = decode_key(key_var, &hex_key)?;
        Ok(Self { merchant_id, hmac_key: Secret::new(hmac_key) })
    }
}

fn decode_key(name: &str, hex_key: &str) -> Result<Vec<u8>, ConfigError> {
    let key = hex::decode(hex_key.trim())
        .map_err(|e| ConfigError::InvalidValue { name: name.to_string(), reason: e.to_string() })?;
    if key.is_empty() {
        return Err(ConfigError::InvalidValue { name: name.to_string(), reason: "The key is empty".into() });
    }
    Ok(key)
}

#[derive(Clone, Debug)]
pub struct DatatransConfig {
    pub web: MerchantCredentials,
    /// Credentials for the direct (server-to-server) API
    pub mpo: MerchantCredentials,
    pub environment: Environment,
    /// How long to wait for Datatrans before giving up on a request. Requests are never retried.
    pub request_timeout: Duration,
    /// Which key pair signs refund requests. Historically this has been the web key.
    pub refund_signing_channel: SigningChannel,
}

impl DatatransConfig {
    pub fn new(web: MerchantCredentials, mpo: MerchantCredentials) -> Self {
        Self {
            web,
            mpo,
            environment: Environment::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refund_signing_channel: SigningChannel::default(),
        }
    }

    /// Loads the configuration from `DTG_*` environment variables. Any missing merchant id or key is an error.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let web = MerchantCredentials::try_from_env("DTG_WEB_MERCHANT_ID", "DTG_WEB_HMAC_KEY")?;
        let mpo = MerchantCredentials::try_from_env("DTG_MPO_MERCHANT_ID", "DTG_MPO_HMAC_KEY")?;
        let timeout = match env::var("DTG_REQUEST_TIMEOUT") {
            Ok(s) => parse_timeout(&s)?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT,
        };
        let refund_signing_channel = match env::var("DTG_REFUND_SIGNING_CHANNEL") {
            Ok(s) => parse_channel(&s).ok_or_else(|| ConfigError::InvalidValue {
                name: "DTG_REFUND_SIGNING_CHANNEL".into(),
                reason: format!("'{s}' is not one of web, direct or mpo"),
            })?,
            Err(_) => SigningChannel::default(),
        };
        Ok(Self {
            web,
            mpo,
            environment: environment_from_env(),
            request_timeout: timeout,
            refund_signing_channel,
        })
    }

    /// Loads the configuration from `DTG_*` environment variables, logging and falling back to defaults for anything
    /// that is missing or invalid.
    ///
    /// The defaults are useless for talking to Datatrans. This is only meant for local development and tests.
    pub fn from_env_or_default() -> Self {
        let web = MerchantCredentials::try_from_env("DTG_WEB_MERCHANT_ID", "DTG_WEB_HMAC_KEY").unwrap_or_else(|e| {
            error!("🪛️ Could not load the web merchant credentials. {e}. Web signatures will not be accepted.");
            MerchantCredentials::default()
        });
        let mpo = MerchantCredentials::try_from_env("DTG_MPO_MERCHANT_ID", "DTG_MPO_HMAC_KEY").unwrap_or_else(|e| {
            error!("🪛️ Could not load the direct (mpo) merchant credentials. {e}. Alias payments will fail.");
            MerchantCredentials::default()
        });
        let request_timeout = env::var("DTG_REQUEST_TIMEOUT")
            .map(|s| {
                parse_timeout(&s).unwrap_or_else(|e| {
                    warn!("🪛️ {e}. Using the default of {}s instead.", DEFAULT_REQUEST_TIMEOUT.as_secs());
                    DEFAULT_REQUEST_TIMEOUT
                })
            })
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let refund_signing_channel = env::var("DTG_REFUND_SIGNING_CHANNEL")
            .map(|s| {
                parse_channel(&s).unwrap_or_else(|| {
                    warn!("🪛️ '{s}' is not a valid DTG_REFUND_SIGNING_CHANNEL. Refunds will be signed with the web key.");
                    SigningChannel::Web
                })
            })
            .unwrap_or_default();
        let environment = environment_from_env();
        info!("🪛️ Datatrans configured for {environment:?}. Refunds are signed with the {refund_signing_channel:?} key.");
        Self { web, mpo, environment, request_timeout, refund_signing_channel }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refund_signing_channel(mut self, channel: SigningChannel) -> Self {
        self.refund_signing_channel = channel;
        self
    }

    pub fn credentials(&self, channel: SigningChannel) -> &MerchantCredentials {
        match channel {
            SigningChannel::Web => &self.web,
            SigningChannel::Direct => &self.mpo,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self.environment {
            Environment::Sandbox => SANDBOX_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        }
    }

    pub fn authorize_url(&self) -> String {
        format!("{}upp/jsp/XML_authorize.jsp", self.base_url())
    }

    pub fn processor_url(&self) -> String {
        format!("{}upp/jsp/XML_processor.jsp", self.base_url())
    }

    /// The payment widget script to embed alongside the form parameters.
    pub fn js_url(&self) -> String {
        format!("{}upp/payment/js/datatrans-1.0.2.js", self.base_url())
    }
}

fn environment_from_env() -> Environment {
    let value = env::var("DTG_ENVIRONMENT").ok();
    parse_choice(value.as_deref(), &[("production", Environment::Production)]).unwrap_or_default()
}

fn parse_channel(value: &str) -> Option<SigningChannel> {
    parse_choice(
        Some(value),
        &[("web", SigningChannel::Web), ("direct", SigningChannel::Direct), ("mpo", SigningChannel::Direct)],
    )
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue {
            name: "DTG_REQUEST_TIMEOUT".into(),
            reason: format!("'{value}' is not a positive number of seconds"),
        }),
    }
}
