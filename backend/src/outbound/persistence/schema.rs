//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. The overlap
//! exclusion constraint and partial indexes are not expressible here and
//! live only in the migrations.

diesel::table! {
    /// Bookable units and their nightly rates.
    units (id) {
        id -> Varchar,
        title -> Text,
        /// Whole won per night.
        nightly_rate_krw -> Int8,
        /// Member allowed to decline reservations on the unit.
        host_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Reservations, never deleted; cancellation is a status write.
    reservations (id) {
        id -> Uuid,
        public_token -> Varchar,
        unit_id -> Varchar,
        user_id -> Nullable<Uuid>,
        guest_email -> Nullable<Varchar>,
        check_in -> Date,
        check_out -> Date,
        adults -> Int2,
        children -> Int2,
        infants -> Int2,
        pets -> Int2,
        total_krw -> Int8,
        total_usd_cents -> Int8,
        cancellation_deadline -> Timestamptz,
        /// One of `PENDING_PAYMENT`, `CONFIRMED`, `CANCELLED`.
        status -> Varchar,
        confirmation_sent -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Payment attempts, one or more per reservation.
    payment_attempts (id) {
        id -> Uuid,
        reservation_id -> Uuid,
        provider -> Varchar,
        provider_payment_id -> Varchar,
        status -> Varchar,
        provider_payload -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Webhook dedup ledger keyed by the provider's delivery id.
    webhook_events (webhook_id) {
        webhook_id -> Varchar,
        webhook_timestamp -> Varchar,
        payload_digest -> Varchar,
        raw_payload -> Text,
        received_at -> Timestamptz,
    }
}

diesel::joinable!(payment_attempts -> reservations (reservation_id));
diesel::joinable!(reservations -> units (unit_id));

diesel::allow_tables_to_appear_in_same_query!(units, reservations, payment_attempts, webhook_events);
