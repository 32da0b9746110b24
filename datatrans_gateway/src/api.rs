use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client,
};

use crate::{config::DatatransConfig, errors::DatatransApiError};

/// The status and body of a response, whatever the status.
///
/// Datatrans reports many errors with a well-formed XML body, so a non-success status alone does not make a response
/// useless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self { status, body: body.to_string() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The two Datatrans XML endpoints the gateway talks to.
#[allow(async_fn_in_trait)]
pub trait DatatransTransport {
    /// POSTs to `XML_authorize.jsp` (alias charges)
    async fn authorize(&self, xml: String) -> Result<RawResponse, DatatransApiError>;
    /// POSTs to `XML_processor.jsp` (refunds)
    async fn process(&self, xml: String) -> Result<RawResponse, DatatransApiError>;
}

#[derive(Clone)]
pub struct DatatransApi {
    authorize_url: String,
    processor_url: String,
    client: Arc<Client>,
}

impl DatatransApi {
    pub fn new(config: &DatatransConfig) -> Result<Self, DatatransApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DatatransApiError::Initialization(e.to_string()))?;
        Ok(Self {
            authorize_url: config.authorize_url(),
            processor_url: config.processor_url(),
            client: Arc::new(client),
        })
    }

    /// Sends an XML document and returns whatever comes back. There are no retries.
    pub async fn post_xml(&self, url: &str, xml: String) -> Result<RawResponse, DatatransApiError> {
        trace!("Sending XML request to {url}");
        let response = self.client.post(url).body(xml).send().await.map_err(|e| transport_error(url, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport_error(url, e))?;
        if (200..300).contains(&status) {
            trace!("XML request successful. {status}");
        } else {
            warn!("Datatrans answered {url} with status {status}");
        }
        Ok(RawResponse { status, body })
    }
}

impl DatatransTransport for DatatransApi {
    async fn authorize(&self, xml: String) -> Result<RawResponse, DatatransApiError> {
        self.post_xml(&self.authorize_url, xml).await
    }

    async fn process(&self, xml: String) -> Result<RawResponse, DatatransApiError> {
        self.post_xml(&self.processor_url, xml).await
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> DatatransApiError {
    if e.is_timeout() {
        DatatransApiError::Timeout { url: url.to_string() }
    } else {
        DatatransApiError::Transport { url: url.to_string(), message: e.to_string() }
    }
}
