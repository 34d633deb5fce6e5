//! Reqwest-backed payment status adapter.
//!
//! This adapter owns transport details only: URL construction, credentials,
//! timeout and HTTP error mapping, and JSON decoding into provider snapshots.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use zeroize::Zeroizing;

use super::dto::PaymentDto;
use crate::domain::payment::{ProviderPaymentId, ProviderPaymentSnapshot};
use crate::domain::ports::{PaymentStatusSource, PaymentStatusSourceError};

/// Errors raised while constructing the adapter.
#[derive(Debug, thiserror::Error)]
pub enum HttpPaymentStatusSourceError {
    #[error("payment provider API base {0} cannot carry path segments")]
    BaseUrl(Url),
    #[error("failed to build payment provider HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Payment status adapter that performs `GET {api_base}/payments/{id}`.
pub struct HttpPaymentStatusSource {
    client: Client,
    api_base: Url,
    api_secret: Zeroizing<String>,
}

impl HttpPaymentStatusSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let source = HttpPaymentStatusSource::new(api_base, secret, Duration::from_secs(10))?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when `api_base` is not a hierarchical URL or the
    /// reqwest client cannot be constructed.
    pub fn new(
        api_base: Url,
        api_secret: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, HttpPaymentStatusSourceError> {
        if api_base.cannot_be_a_base() {
            return Err(HttpPaymentStatusSourceError::BaseUrl(api_base));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base,
            api_secret,
        })
    }

    fn payment_url(&self, payment_id: &ProviderPaymentId) -> Result<Url, PaymentStatusSourceError> {
        payment_url(&self.api_base, payment_id)
    }
}

#[async_trait]
impl PaymentStatusSource for HttpPaymentStatusSource {
    async fn fetch_payment(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<ProviderPaymentSnapshot, PaymentStatusSourceError> {
        let url = self.payment_url(payment_id)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.api_secret.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, payment_id, body.as_ref()));
        }

        parse_payment(body.as_ref())
    }
}

fn payment_url(base: &Url, payment_id: &ProviderPaymentId) -> Result<Url, PaymentStatusSourceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| PaymentStatusSourceError::transport(format!("invalid API base {base}")))?
        .pop_if_empty()
        .extend(["payments", payment_id.as_ref()]);
    Ok(url)
}

fn parse_payment(body: &[u8]) -> Result<ProviderPaymentSnapshot, PaymentStatusSourceError> {
    let raw: Value = serde_json::from_slice(body).map_err(|error| {
        PaymentStatusSourceError::decode(format!("invalid payment JSON payload: {error}"))
    })?;
    let dto: PaymentDto = serde_json::from_value(raw.clone()).map_err(|error| {
        PaymentStatusSourceError::decode(format!("unexpected payment document: {error}"))
    })?;
    dto.into_snapshot(raw)
        .map_err(PaymentStatusSourceError::decode)
}

fn map_transport_error(error: reqwest::Error) -> PaymentStatusSourceError {
    if error.is_timeout() {
        PaymentStatusSourceError::transport(format!("timed out: {error}"))
    } else {
        PaymentStatusSourceError::transport(error.to_string())
    }
}

fn map_status_error(
    status: StatusCode,
    payment_id: &ProviderPaymentId,
    body: &[u8],
) -> PaymentStatusSourceError {
    if status == StatusCode::NOT_FOUND {
        return PaymentStatusSourceError::not_found(payment_id.as_ref());
    }
    PaymentStatusSourceError::status(status.as_u16(), body_preview(body))
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
