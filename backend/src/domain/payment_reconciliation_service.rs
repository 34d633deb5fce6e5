//! Provider webhook ingestion and payment reconciliation.
//!
//! Webhooks and client-initiated reconciliation share one status dispatcher,
//! so both paths follow identical transition rules for the same payment.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::domain::payment::{
    PaymentAttempt, PaymentGateway, ProviderPaymentId, ProviderPaymentStatus,
};
use crate::domain::ports::{
    BookingMetrics, ConfirmationNotifier, PaymentCompletion, PaymentReconciliation,
    ReservationRepository, ReservationView, WebhookLedger, WebhookLedgerError,
    WebhookSignatureVerifier, WebhookVerificationError,
};
use crate::domain::reservation::{StatusTransition, TransitionOutcome, TransitionReport};
use crate::domain::service_support::{dispatch_confirmation, log_metrics_failure, map_store_error};
use crate::domain::webhook::{
    ProviderEvent, ReconciliationOutcome, WebhookDelivery, WebhookId, WebhookLedgerEntry,
};
use crate::domain::Error;

/// Driven ports used by [`PaymentReconciliationService`].
#[derive(Clone)]
pub struct PaymentReconciliationPorts {
    pub reservations: Arc<dyn ReservationRepository>,
    pub ledger: Arc<dyn WebhookLedger>,
    pub verifier: Arc<dyn WebhookSignatureVerifier>,
    pub notifier: Arc<dyn ConfirmationNotifier>,
    pub metrics: Arc<dyn BookingMetrics>,
}

/// Applies provider-reported payment state to reservations.
#[derive(Clone)]
pub struct PaymentReconciliationService {
    ports: PaymentReconciliationPorts,
    clock: Arc<dyn Clock>,
    gateway: PaymentGateway,
}

/// Outcome of one reconciliation plus the attempt it matched.
struct Applied {
    outcome: ReconciliationOutcome,
    attempt: Option<PaymentAttempt>,
}

impl PaymentReconciliationService {
    pub fn new(ports: PaymentReconciliationPorts, clock: Arc<dyn Clock>, gateway: PaymentGateway) -> Self {
        Self {
            ports,
            clock,
            gateway,
        }
    }

    async fn apply_status(
        &self,
        payment_id: &ProviderPaymentId,
        status: ProviderPaymentStatus,
        raw: Value,
    ) -> Result<Applied, Error> {
        let attempt = self
            .ports
            .reservations
            .find_attempt_by_payment_id(payment_id)
            .await
            .map_err(map_store_error)?;
        let Some(attempt) = attempt else {
            warn!(%payment_id, status = ?status, "no payment attempt matches provider payment");
            return Ok(Applied {
                outcome: ReconciliationOutcome::Orphan,
                attempt: None,
            });
        };

        let transition = match &status {
            ProviderPaymentStatus::Paid => StatusTransition::ConfirmPayment {
                attempt_id: Some(attempt.id),
                provider_payload: Some(raw),
            },
            ProviderPaymentStatus::Failed | ProviderPaymentStatus::Cancelled => {
                let Some(attempt_status) = status.failure_status() else {
                    return Ok(Applied {
                        outcome: ReconciliationOutcome::Unhandled,
                        attempt: Some(attempt),
                    });
                };
                StatusTransition::FailPayment {
                    attempt_id: attempt.id,
                    attempt_status,
                    provider_payload: Some(raw),
                }
            }
            ProviderPaymentStatus::Other(value) => {
                info!(%payment_id, status = %value, "provider status not acted upon");
                return Ok(Applied {
                    outcome: ReconciliationOutcome::Unhandled,
                    attempt: Some(attempt),
                });
            }
        };

        let is_payment = matches!(transition, StatusTransition::ConfirmPayment { .. });
        let outcome = self
            .ports
            .reservations
            .apply_transition(attempt.reservation_id, transition, self.clock.utc())
            .await
            .map_err(map_store_error)?;
        let reconciliation = classify(&outcome, is_payment);
        let report = outcome.into_report();
        log_transition(payment_id, reconciliation, &report);
        if report.send_confirmation {
            dispatch_confirmation(self.ports.notifier.as_ref(), &report.reservation).await;
        }
        Ok(Applied {
            outcome: reconciliation,
            attempt: Some(attempt),
        })
    }

    /// Drop the ledger row of a delivery that could not be applied so the
    /// provider's redelivery is reconciled instead of short-circuited.
    async fn release_delivery(&self, webhook_id: &WebhookId) {
        if let Err(err) = self.ports.ledger.release(webhook_id).await {
            error!(
                %webhook_id,
                error = %err,
                "failed to release webhook after reconciliation error; redelivery will be skipped"
            );
        }
    }

    async fn finish(&self, outcome: ReconciliationOutcome) -> ReconciliationOutcome {
        log_metrics_failure(self.ports.metrics.record_reconciliation(outcome).await);
        outcome
    }
}

fn classify(outcome: &TransitionOutcome, is_payment: bool) -> ReconciliationOutcome {
    match (outcome, is_payment) {
        (TransitionOutcome::Applied(_), true) => ReconciliationOutcome::Confirmed,
        (TransitionOutcome::AlreadyApplied(_), true) => ReconciliationOutcome::AlreadyConfirmed,
        (TransitionOutcome::Refused(_), true) => ReconciliationOutcome::Ignored,
        (TransitionOutcome::Applied(_), false) => ReconciliationOutcome::Cancelled,
        (TransitionOutcome::AlreadyApplied(_), false) => ReconciliationOutcome::AlreadyCancelled,
        (TransitionOutcome::Refused(_), false) => ReconciliationOutcome::AlreadyConfirmed,
    }
}

fn log_transition(
    payment_id: &ProviderPaymentId,
    outcome: ReconciliationOutcome,
    report: &TransitionReport,
) {
    let reservation_id = report.reservation.id;
    match outcome {
        ReconciliationOutcome::Confirmed | ReconciliationOutcome::Cancelled => {
            info!(%reservation_id, %payment_id, %outcome, "payment reconciled");
        }
        ReconciliationOutcome::Ignored => {
            warn!(
                %reservation_id,
                %payment_id,
                "payment succeeded for a cancelled reservation; refund required"
            );
        }
        _ => debug!(%reservation_id, %payment_id, %outcome, "payment event already reflected"),
    }
}

fn verification_error(err: WebhookVerificationError) -> Error {
    match err {
        WebhookVerificationError::Misconfigured { message } => {
            error!(%message, "webhook verifier misconfigured");
            Error::internal("webhook verification is not configured")
        }
        other => {
            warn!(reason = %other, "rejected webhook delivery");
            Error::unauthorized("webhook signature verification failed")
        }
    }
}

fn ledger_error(err: WebhookLedgerError) -> Error {
    match err {
        WebhookLedgerError::Connection { message } => {
            warn!(%message, "webhook ledger unavailable");
            Error::service_unavailable("webhook ledger is unavailable")
        }
        WebhookLedgerError::Query { message } => {
            error!(%message, "webhook ledger failure");
            Error::internal(format!("webhook ledger error: {message}"))
        }
    }
}

#[async_trait]
impl PaymentReconciliation for PaymentReconciliationService {
    async fn apply_provider_event(
        &self,
        delivery: WebhookDelivery,
    ) -> Result<ReconciliationOutcome, Error> {
        self.ports
            .verifier
            .verify(&delivery)
            .map_err(verification_error)?;

        let entry = WebhookLedgerEntry::from_delivery(&delivery, self.clock.utc());
        let inserted = self
            .ports
            .ledger
            .record_if_new(&entry)
            .await
            .map_err(ledger_error)?;
        if !inserted {
            debug!(webhook_id = %delivery.id, "duplicate webhook delivery");
            return Ok(self.finish(ReconciliationOutcome::AlreadyProcessed).await);
        }

        let event = ProviderEvent::parse(&delivery.body).map_err(|err| {
            error!(webhook_id = %delivery.id, error = %err, "malformed provider payload");
            Error::internal(format!("malformed provider payload: {err}"))
        })?;
        let Some(payment_id) = event.payment_id else {
            info!(
                webhook_id = %delivery.id,
                event_type = %event.event_type,
                "provider event carries no payment"
            );
            return Ok(self.finish(ReconciliationOutcome::Unhandled).await);
        };

        let applied = match self.apply_status(&payment_id, event.status, event.raw).await {
            Ok(applied) => applied,
            Err(err) => {
                self.release_delivery(&delivery.id).await;
                return Err(err);
            }
        };
        Ok(self.finish(applied.outcome).await)
    }

    async fn complete_payment(
        &self,
        payment_id: &ProviderPaymentId,
    ) -> Result<PaymentCompletion, Error> {
        let snapshot = self.gateway.reconcile(payment_id).await?;
        if snapshot.payment_id != *payment_id {
            return Err(Error::internal(format!(
                "provider answered for payment {} instead of {payment_id}",
                snapshot.payment_id
            )));
        }
        let applied = self
            .apply_status(payment_id, snapshot.status, snapshot.raw)
            .await?;
        let outcome = self.finish(applied.outcome).await;
        let reservation = match applied.attempt {
            Some(attempt) => self
                .ports
                .reservations
                .find_by_id(attempt.reservation_id)
                .await
                .map_err(map_store_error)?
                .map(|record| ReservationView::from(&record)),
            None => None,
        };
        Ok(PaymentCompletion {
            outcome,
            reservation,
        })
    }
}

#[cfg(test)]
#[path = "payment_reconciliation_service_tests.rs"]
mod tests;
