//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations only translate between Diesel rows and domain
//! types; lifecycle rules stay in the domain. Row structs (`models.rs`) and
//! table definitions (`schema.rs`) never leave this module.
//!
//! # Example
//!
//! ```ignore
//! use lodging_backend::outbound::persistence::{
//!     DbPool, DieselReservationRepository, PoolConfig, run_pending_migrations,
//! };
//!
//! run_pending_migrations("postgres://localhost/lodging").await?;
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/lodging")).await?;
//! let reservations = DieselReservationRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_reservation_repository;
mod diesel_unit_catalogue;
mod diesel_webhook_ledger;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_reservation_repository::DieselReservationRepository;
pub use diesel_unit_catalogue::DieselUnitCatalogue;
pub use diesel_webhook_ledger::DieselWebhookLedger;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
