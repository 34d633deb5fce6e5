//! Booking orchestrator.
//!
//! Turns a date-range request into an exclusively held `PENDING_PAYMENT`
//! reservation and hands the client a payment intent. The conflict check and
//! insert happen atomically inside the reservation store; pricing lookup and
//! intent building stay outside that boundary.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::civil_time::CancellationPolicy;
use crate::domain::identity::{Caller, Requester};
use crate::domain::payment::{
    NewPaymentAttempt, PaymentAttemptId, PaymentGateway, ProviderPaymentId, order_name,
};
use crate::domain::ports::{
    AvailabilityQuote, AvailabilityRequest, BookingCommand, BookingMetrics, BookingOutcome,
    ConfirmationNotifier, CreatePendingOutcome, CreateReservationRequest,
    CreateReservationResponse, OpenAttemptOutcome, PartyCounts, PaymentAttemptResponse,
    ReservationQuery, ReservationRepository, ReservationView, UnitCatalogue, UnitPricing,
};
use crate::domain::reservation::{
    CancellationReason, DisplayConversion, NewReservation, PartyComposition, PriceTotals,
    PricingError, PublicToken, ReservationId, ReservationRecord, ReservationStatus, StayDates,
    StatusTransition, TransitionOutcome, UnitId,
};
use crate::domain::service_support::{
    dispatch_confirmation, log_metrics_failure, map_catalogue_error, map_store_error,
};
use crate::domain::Error;

/// Business constants applied to every new reservation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingPolicy {
    pub cancellation: CancellationPolicy,
    pub conversion: DisplayConversion,
}

/// Driven ports used by [`BookingService`].
#[derive(Clone)]
pub struct BookingServicePorts {
    pub reservations: Arc<dyn ReservationRepository>,
    pub catalogue: Arc<dyn UnitCatalogue>,
    pub notifier: Arc<dyn ConfirmationNotifier>,
    pub metrics: Arc<dyn BookingMetrics>,
}

/// Booking service implementing the command and query driving ports.
#[derive(Clone)]
pub struct BookingService {
    reservations: Arc<dyn ReservationRepository>,
    catalogue: Arc<dyn UnitCatalogue>,
    notifier: Arc<dyn ConfirmationNotifier>,
    metrics: Arc<dyn BookingMetrics>,
    clock: Arc<dyn Clock>,
    gateway: PaymentGateway,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(
        ports: BookingServicePorts,
        clock: Arc<dyn Clock>,
        gateway: PaymentGateway,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            reservations: ports.reservations,
            catalogue: ports.catalogue,
            notifier: ports.notifier,
            metrics: ports.metrics,
            clock,
            gateway,
            policy,
        }
    }

    async fn load(&self, token: &PublicToken) -> Result<ReservationRecord, Error> {
        self.reservations
            .find_by_token(token)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found("reservation not found"))
    }

    async fn view(&self, token: &PublicToken) -> Result<ReservationView, Error> {
        self.load(token).await.map(|record| ReservationView::from(&record))
    }

    async fn pricing(&self, unit_id: &UnitId) -> Result<UnitPricing, Error> {
        self.catalogue
            .unit_pricing(unit_id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("unit {unit_id} not found")))
    }

    fn price(&self, pricing: &UnitPricing, stay: &StayDates) -> Result<PriceTotals, Error> {
        PriceTotals::compute(pricing.nightly_rate_krw, stay.nights(), self.policy.conversion)
            .map_err(|err| match err {
                PricingError::Overflow { .. } => {
                    Error::invalid_request(err.to_string()).with_details(json!({
                        "field": "checkOut",
                        "code": "stay_too_long",
                    }))
                }
                other => Error::internal(format!(
                    "unit {} has unusable pricing: {other}",
                    pricing.unit_id
                )),
            })
    }

    async fn cancel_pending(
        &self,
        record: &ReservationRecord,
        reason: CancellationReason,
    ) -> Result<ReservationView, Error> {
        let reservation = &record.reservation;
        let outcome = self
            .reservations
            .apply_transition(
                reservation.id,
                StatusTransition::Cancel { reason },
                self.clock.utc(),
            )
            .await
            .map_err(map_store_error)?;
        match outcome {
            TransitionOutcome::Applied(_) => {
                info!(
                    reservation_id = %reservation.id,
                    reason = reason.as_str(),
                    "reservation cancelled"
                );
                self.view(&reservation.public_token).await
            }
            TransitionOutcome::AlreadyApplied(report) | TransitionOutcome::Refused(report) => {
                Err(not_pending(report.reservation.status))
            }
        }
    }
}

fn validate_stay(request: &CreateReservationRequest) -> Result<StayDates, Error> {
    StayDates::new(request.check_in, request.check_out).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": "checkOut",
            "code": "check_out_not_after_check_in",
        }))
    })
}

fn validate_party(counts: PartyCounts) -> Result<PartyComposition, Error> {
    PartyComposition::from_counts(counts.adults, counts.children, counts.infants, counts.pets)
        .map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({
                "field": err.field,
                "value": err.value,
                "code": "party_count_out_of_range",
            }))
        })
}

fn validate_requester(caller: Caller) -> Result<Requester, Error> {
    let user_id = caller.user_id().cloned();
    let email = caller.email().cloned();
    Requester::new(user_id, email).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": "guestEmail",
            "code": "missing_identity",
        }))
    })
}

fn not_pending(status: ReservationStatus) -> Error {
    Error::conflict(format!("reservation is {status}, not PENDING_PAYMENT"))
}

#[async_trait]
impl BookingCommand for BookingService {
    async fn create_reservation(
        &self,
        request: CreateReservationRequest,
    ) -> Result<CreateReservationResponse, Error> {
        let stay = validate_stay(&request)?;
        let party = validate_party(request.party)?;
        let requester = validate_requester(request.caller.clone())?;
        let pricing = self.pricing(&request.unit_id).await?;
        let totals = self.price(&pricing, &stay)?;
        let cancellation_deadline = self
            .policy
            .cancellation
            .deadline_for(stay.check_in())
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let now = self.clock.utc();
        let public_token = PublicToken::generate();
        let draft = NewReservation {
            id: ReservationId::random(),
            first_attempt: NewPaymentAttempt {
                id: PaymentAttemptId::random(),
                provider: self.gateway.provider(),
                provider_payment_id: ProviderPaymentId::for_attempt(&public_token, 0),
                created_at: now,
            },
            public_token,
            unit_id: request.unit_id,
            requester,
            stay,
            party,
            totals,
            cancellation_deadline,
            created_at: now,
        };

        let record = match self
            .reservations
            .create_pending(draft)
            .await
            .map_err(map_store_error)?
        {
            CreatePendingOutcome::Created(record) => record,
            CreatePendingOutcome::DatesUnavailable => {
                log_metrics_failure(
                    self.metrics
                        .record_booking(BookingOutcome::DatesUnavailable)
                        .await,
                );
                return Err(Error::conflict("selected dates are not available"));
            }
        };
        log_metrics_failure(self.metrics.record_booking(BookingOutcome::Created).await);
        info!(
            reservation_id = %record.reservation.id,
            unit_id = %record.reservation.unit_id,
            nights = stay.nights(),
            "reservation held pending payment"
        );

        let payment_intent = record.attempts.first().and_then(|attempt| {
            self.gateway
                .build_intent(
                    &record.reservation,
                    attempt,
                    order_name(&pricing.title, stay.nights()),
                )
                .inspect_err(|err| {
                    warn!(
                        reservation_id = %record.reservation.id,
                        error = %err,
                        "payment intent could not be built; client may retry"
                    );
                })
                .ok()
        });

        Ok(CreateReservationResponse {
            reservation: ReservationView::from(&record),
            payment_intent,
        })
    }

    async fn open_payment_attempt(&self, token: &PublicToken) -> Result<PaymentAttemptResponse, Error> {
        let current = self.load(token).await?;
        if current.reservation.status != ReservationStatus::PendingPayment {
            return Err(not_pending(current.reservation.status));
        }
        let outcome = self
            .reservations
            .open_payment_attempt(
                current.reservation.id,
                PaymentAttemptId::random(),
                self.gateway.provider(),
                self.clock.utc(),
            )
            .await
            .map_err(map_store_error)?;
        let (record, attempt) = match outcome {
            OpenAttemptOutcome::Opened { record, attempt } => (record, attempt),
            OpenAttemptOutcome::NotPending(status) => return Err(not_pending(status)),
        };
        let title = self
            .catalogue
            .unit_pricing(&record.reservation.unit_id)
            .await
            .map_err(map_catalogue_error)?
            .map_or_else(|| record.reservation.unit_id.to_string(), |unit| unit.title);
        let payment_intent = self.gateway.build_intent(
            &record.reservation,
            &attempt,
            order_name(&title, record.reservation.stay.nights()),
        )?;
        info!(
            reservation_id = %record.reservation.id,
            payment_id = %attempt.provider_payment_id,
            "payment attempt opened"
        );
        Ok(PaymentAttemptResponse {
            reservation: ReservationView::from(&record),
            payment_intent,
        })
    }

    async fn confirm_mock_payment(&self, token: &PublicToken) -> Result<ReservationView, Error> {
        self.gateway.ensure_mock_confirmation()?;
        let record = self.load(token).await?;
        let transition = StatusTransition::ConfirmPayment {
            attempt_id: record.latest_open_attempt().map(|attempt| attempt.id),
            provider_payload: None,
        };
        let outcome = self
            .reservations
            .apply_transition(record.reservation.id, transition, self.clock.utc())
            .await
            .map_err(map_store_error)?;
        let report = match outcome {
            TransitionOutcome::Refused(report) => {
                return Err(Error::conflict(format!(
                    "reservation is {} and cannot be confirmed",
                    report.reservation.status
                )));
            }
            TransitionOutcome::Applied(report) => {
                info!(reservation_id = %report.reservation.id, "reservation confirmed by mock payment");
                report
            }
            TransitionOutcome::AlreadyApplied(report) => report,
        };
        if report.send_confirmation {
            dispatch_confirmation(self.notifier.as_ref(), &report.reservation).await;
        }
        self.view(token).await
    }

    async fn decline_reservation(
        &self,
        token: &PublicToken,
        caller: Caller,
    ) -> Result<ReservationView, Error> {
        let Some(host) = caller.user_id() else {
            return Err(Error::unauthorized("sign in as the host to decline a reservation"));
        };
        let record = self.load(token).await?;
        let unit = self
            .catalogue
            .unit_pricing(&record.reservation.unit_id)
            .await
            .map_err(map_catalogue_error)?;
        if unit.and_then(|unit| unit.host_id).as_ref() != Some(host) {
            return Err(Error::forbidden("only the unit's host may decline this reservation"));
        }
        if record.reservation.status != ReservationStatus::PendingPayment {
            return Err(not_pending(record.reservation.status));
        }
        self.cancel_pending(&record, CancellationReason::HostDeclined)
            .await
    }

    async fn cancel_reservation(
        &self,
        token: &PublicToken,
        caller: Caller,
    ) -> Result<ReservationView, Error> {
        let record = self.load(token).await?;
        let reservation = &record.reservation;
        if !reservation.requester.is_owned_by(&caller) {
            if caller.user_id().is_none() && caller.email().is_none() {
                return Err(Error::unauthorized(
                    "sign in or supply the booking email to cancel",
                ));
            }
            return Err(Error::forbidden("only the requester may cancel this reservation"));
        }
        if reservation.status != ReservationStatus::PendingPayment {
            return Err(not_pending(reservation.status));
        }
        if !reservation.within_free_cancellation(self.clock.utc()) {
            return Err(Error::conflict(format!(
                "free cancellation ended at {}",
                reservation.cancellation_deadline.to_rfc3339()
            )));
        }
        self.cancel_pending(&record, CancellationReason::GuestCancelled)
            .await
    }
}

#[async_trait]
impl ReservationQuery for BookingService {
    async fn get_reservation(&self, token: &PublicToken) -> Result<ReservationView, Error> {
        self.view(token).await
    }

    async fn check_availability(
        &self,
        request: AvailabilityRequest,
    ) -> Result<AvailabilityQuote, Error> {
        let stay = StayDates::new(request.check_in, request.check_out).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({
                "field": "checkOut",
                "code": "check_out_not_after_check_in",
            }))
        })?;
        let pricing = self.pricing(&request.unit_id).await?;
        let totals = self.price(&pricing, &stay)?;
        let conflict = self
            .reservations
            .has_conflict(&request.unit_id, &stay, None)
            .await
            .map_err(map_store_error)?;
        Ok(AvailabilityQuote {
            unit_id: request.unit_id,
            stay,
            available: !conflict,
            nights: stay.nights(),
            totals,
        })
    }
}

#[cfg(test)]
#[path = "booking_service_tests.rs"]
mod tests;
