//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types validate
//! every column and report the first problem as a plain message.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::civil_time::to_civil;
use crate::domain::identity::{GuestEmail, Requester, UserId};
use crate::domain::payment::{
    NewPaymentAttempt, PaymentAttempt, PaymentAttemptId, PaymentAttemptStatus, PaymentProvider,
    ProviderPaymentId,
};
use crate::domain::ports::UnitPricing;
use crate::domain::reservation::{
    NewReservation, PartyComposition, PriceTotals, PublicToken, Reservation, ReservationId,
    ReservationRecord, ReservationStatus, StayDates, UnitId,
};
use crate::domain::webhook::WebhookLedgerEntry;

use super::schema::{payment_attempts, reservations, units, webhook_events};

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = units)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UnitRow {
    pub id: String,
    pub title: String,
    pub nightly_rate_krw: i64,
    pub host_id: Option<Uuid>,
}

impl TryFrom<UnitRow> for UnitPricing {
    type Error = String;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        let unit_id = UnitId::new(row.id).map_err(|err| format!("unit id: {err}"))?;
        Ok(Self {
            unit_id,
            title: row.title,
            nightly_rate_krw: row.nightly_rate_krw,
            host_id: row.host_id.map(UserId::from_uuid),
        })
    }
}

/// Insertable unit, used by seeding and tests.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = units)]
pub(crate) struct NewUnitRow<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub nightly_rate_krw: i64,
    pub host_id: Option<Uuid>,
}

impl<'a> From<&'a UnitPricing> for NewUnitRow<'a> {
    fn from(unit: &'a UnitPricing) -> Self {
        Self {
            id: unit.unit_id.as_ref(),
            title: &unit.title,
            nightly_rate_krw: unit.nightly_rate_krw,
            host_id: unit.host_id.as_ref().map(|host| *host.as_uuid()),
        }
    }
}

// ---------------------------------------------------------------------------
// Reservations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reservations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReservationRow {
    pub id: Uuid,
    pub public_token: String,
    pub unit_id: String,
    pub user_id: Option<Uuid>,
    pub guest_email: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i16,
    pub children: i16,
    pub infants: i16,
    pub pets: i16,
    pub total_krw: i64,
    pub total_usd_cents: i64,
    pub cancellation_deadline: DateTime<Utc>,
    pub status: String,
    pub confirmation_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = reservations)]
pub(crate) struct NewReservationRow<'a> {
    pub id: Uuid,
    pub public_token: &'a str,
    pub unit_id: &'a str,
    pub user_id: Option<Uuid>,
    pub guest_email: Option<&'a str>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: i16,
    pub children: i16,
    pub infants: i16,
    pub pets: i16,
    pub total_krw: i64,
    pub total_usd_cents: i64,
    pub cancellation_deadline: DateTime<Utc>,
    pub status: &'static str,
    pub confirmation_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn count_column(field: &str, value: u16) -> Result<i16, String> {
    i16::try_from(value).map_err(|_| format!("{field} count {value} exceeds column range"))
}

fn count_value(field: &str, value: i16) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("{field} count {value} is negative"))
}

impl<'a> TryFrom<&'a NewReservation> for NewReservationRow<'a> {
    type Error = String;

    fn try_from(draft: &'a NewReservation) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *draft.id.as_uuid(),
            public_token: draft.public_token.as_ref(),
            unit_id: draft.unit_id.as_ref(),
            user_id: draft.requester.user_id().map(|user| *user.as_uuid()),
            guest_email: draft.requester.email().map(AsRef::as_ref),
            check_in: draft.stay.check_in(),
            check_out: draft.stay.check_out(),
            adults: count_column("adults", draft.party.adults)?,
            children: count_column("children", draft.party.children)?,
            infants: count_column("infants", draft.party.infants)?,
            pets: count_column("pets", draft.party.pets)?,
            total_krw: draft.totals.total_krw,
            total_usd_cents: draft.totals.total_usd_cents,
            cancellation_deadline: draft.cancellation_deadline.with_timezone(&Utc),
            status: ReservationStatus::PendingPayment.as_str(),
            confirmation_sent: false,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        })
    }
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = String;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let public_token =
            PublicToken::parse(row.public_token).map_err(|err| format!("public token: {err}"))?;
        let unit_id = UnitId::new(row.unit_id).map_err(|err| format!("unit id: {err}"))?;
        let email = row
            .guest_email
            .map(GuestEmail::new)
            .transpose()
            .map_err(|err| format!("guest email: {err}"))?;
        let requester = Requester::new(row.user_id.map(UserId::from_uuid), email)
            .map_err(|err| format!("requester: {err}"))?;
        let stay =
            StayDates::new(row.check_in, row.check_out).map_err(|err| format!("stay: {err}"))?;
        let status = ReservationStatus::from_str(&row.status).map_err(|err| err.to_string())?;
        Ok(Self {
            id: ReservationId::from_uuid(row.id),
            public_token,
            unit_id,
            requester,
            stay,
            party: PartyComposition {
                adults: count_value("adults", row.adults)?,
                children: count_value("children", row.children)?,
                infants: count_value("infants", row.infants)?,
                pets: count_value("pets", row.pets)?,
            },
            totals: PriceTotals {
                total_krw: row.total_krw,
                total_usd_cents: row.total_usd_cents,
            },
            cancellation_deadline: to_civil(row.cancellation_deadline),
            status,
            confirmation_sent: row.confirmation_sent,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Payment attempts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = payment_attempts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentAttemptRow {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub provider: String,
    pub provider_payment_id: String,
    pub status: String,
    pub provider_payload: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payment_attempts)]
pub(crate) struct NewPaymentAttemptRow<'a> {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub provider: &'static str,
    pub provider_payment_id: &'a str,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewPaymentAttemptRow<'a> {
    pub fn new(reservation_id: ReservationId, attempt: &'a NewPaymentAttempt) -> Self {
        Self {
            id: *attempt.id.as_uuid(),
            reservation_id: *reservation_id.as_uuid(),
            provider: attempt.provider.as_str(),
            provider_payment_id: attempt.provider_payment_id.as_ref(),
            status: PaymentAttemptStatus::Initiated.as_str(),
            created_at: attempt.created_at,
            updated_at: attempt.created_at,
        }
    }
}

impl TryFrom<PaymentAttemptRow> for PaymentAttempt {
    type Error = String;

    fn try_from(row: PaymentAttemptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PaymentAttemptId::from_uuid(row.id),
            reservation_id: ReservationId::from_uuid(row.reservation_id),
            provider: PaymentProvider::from_str(&row.provider).map_err(|err| err.to_string())?,
            provider_payment_id: ProviderPaymentId::new(row.provider_payment_id)
                .map_err(|err| format!("provider payment id: {err}"))?,
            status: PaymentAttemptStatus::from_str(&row.status).map_err(|err| err.to_string())?,
            provider_payload: row.provider_payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Assemble a record from a reservation row and its attempt rows.
pub(crate) fn into_record(
    row: ReservationRow,
    attempts: Vec<PaymentAttemptRow>,
) -> Result<ReservationRecord, String> {
    Ok(ReservationRecord {
        reservation: Reservation::try_from(row)?,
        attempts: attempts
            .into_iter()
            .map(PaymentAttempt::try_from)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

// ---------------------------------------------------------------------------
// Webhook ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_events)]
pub(crate) struct NewWebhookEventRow<'a> {
    pub webhook_id: &'a str,
    pub webhook_timestamp: &'a str,
    pub payload_digest: &'a str,
    pub raw_payload: &'a str,
    pub received_at: DateTime<Utc>,
}

impl<'a> From<&'a WebhookLedgerEntry> for NewWebhookEventRow<'a> {
    fn from(entry: &'a WebhookLedgerEntry) -> Self {
        Self {
            webhook_id: entry.webhook_id.as_ref(),
            webhook_timestamp: &entry.webhook_timestamp,
            payload_digest: &entry.payload_digest,
            raw_payload: &entry.raw_payload,
            received_at: entry.received_at,
        }
    }
}
