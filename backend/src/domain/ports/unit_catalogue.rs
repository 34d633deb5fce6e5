//! Port for resolving unit pricing from the listing catalogue.

use async_trait::async_trait;

use crate::domain::identity::UserId;
use crate::domain::reservation::UnitId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalogue adapters.
    pub enum UnitCatalogueError {
        /// Catalogue backend could not be reached.
        Connection { message: String } => "unit catalogue connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } => "unit catalogue query failed: {message}",
    }
}

/// Pricing facts the booking engine needs about a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPricing {
    pub unit_id: UnitId,
    pub title: String,
    /// Price per night in whole won.
    pub nightly_rate_krw: i64,
    /// Member who may decline reservations for the unit.
    pub host_id: Option<UserId>,
}

/// Read-only catalogue lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnitCatalogue: Send + Sync {
    /// Pricing for `unit_id`, or `None` when the unit is unknown.
    async fn unit_pricing(&self, unit_id: &UnitId) -> Result<Option<UnitPricing>, UnitCatalogueError>;
}
