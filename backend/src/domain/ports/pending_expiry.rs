//! Driving port for expiring abandoned reservations.

use async_trait::async_trait;

use crate::domain::Error;

/// Driving port for the expiry sweep.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PendingExpiry: Send + Sync {
    /// Cancel pending reservations created more than `older_than_hours` ago.
    ///
    /// Returns how many reservations were cancelled; a repeat run with no new
    /// stale rows returns zero.
    async fn expire_stale_pending(&self, older_than_hours: u32) -> Result<u64, Error>;
}
