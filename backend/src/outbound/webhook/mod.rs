//! HMAC-SHA256 webhook signature verification.
//!
//! Deliveries are signed over `"{webhook-id}.{webhook-timestamp}.{body}"` and
//! carry one or more space-separated `v1,<base64 mac>` entries in the
//! `webhook-signature` header. Secrets may be given raw or as `whsec_<base64>`.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use mockable::Clock;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::domain::ports::{WebhookSignatureVerifier, WebhookVerificationError};
use crate::domain::webhook::WebhookDelivery;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// Maximum accepted distance between the delivery timestamp and now.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Verifier holding the shared webhook secret.
pub struct HmacWebhookVerifier {
    key: Zeroizing<Vec<u8>>,
    tolerance_secs: i64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for HmacWebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacWebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl HmacWebhookVerifier {
    /// Build a verifier from the configured secret.
    ///
    /// # Errors
    /// Returns [`WebhookVerificationError::Misconfigured`] for an empty secret
    /// or a `whsec_` secret whose remainder is not base64.
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, WebhookVerificationError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(WebhookVerificationError::misconfigured(
                "webhook secret is empty",
            ));
        }
        let key = match secret.strip_prefix(SECRET_PREFIX) {
            Some(encoded) => STANDARD.decode(encoded).map_err(|err| {
                WebhookVerificationError::misconfigured(format!(
                    "webhook secret is not valid base64: {err}"
                ))
            })?,
            None => secret.as_bytes().to_vec(),
        };
        Ok(Self {
            key: Zeroizing::new(key),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            clock,
        })
    }

    #[must_use]
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, WebhookVerificationError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|err| WebhookVerificationError::misconfigured(err.to_string()))?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Produce the `v1,<base64>` signature for a delivery.
    pub fn sign(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<String, WebhookVerificationError> {
        let digest = self.mac(id, timestamp, body)?.finalize().into_bytes();
        Ok(format!("{SIGNATURE_VERSION},{}", STANDARD.encode(digest)))
    }

    fn check_timestamp(&self, raw: &str) -> Result<(), WebhookVerificationError> {
        let sent: i64 = raw
            .trim()
            .parse()
            .map_err(|_| WebhookVerificationError::malformed_timestamp(raw))?;
        let skew_secs = self.clock.utc().timestamp().saturating_sub(sent);
        if skew_secs.unsigned_abs() > self.tolerance_secs.unsigned_abs() {
            return Err(WebhookVerificationError::stale_timestamp(skew_secs));
        }
        Ok(())
    }
}

impl WebhookSignatureVerifier for HmacWebhookVerifier {
    fn verify(&self, delivery: &WebhookDelivery) -> Result<(), WebhookVerificationError> {
        self.check_timestamp(&delivery.timestamp)?;
        let mac = self.mac(delivery.id.as_ref(), &delivery.timestamp, &delivery.body)?;
        let matched = delivery
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, encoded)| STANDARD.decode(encoded).ok())
            .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());
        if matched {
            Ok(())
        } else {
            Err(WebhookVerificationError::SignatureMismatch)
        }
    }
}

/// Verifier installed when no webhook secret is configured; every delivery
/// is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledWebhookVerifier;

impl WebhookSignatureVerifier for DisabledWebhookVerifier {
    fn verify(&self, _delivery: &WebhookDelivery) -> Result<(), WebhookVerificationError> {
        Err(WebhookVerificationError::misconfigured(
            "no webhook secret configured",
        ))
    }
}
