//! PostgreSQL-backed unit catalogue.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use tracing::info;

use crate::domain::ports::{UnitCatalogue, UnitCatalogueError, UnitPricing};
use crate::domain::reservation::UnitId;

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewUnitRow, UnitRow};
use super::pool::{DbPool, PoolError};
use super::schema::units;

/// Diesel-backed implementation of the unit catalogue port.
#[derive(Clone)]
pub struct DieselUnitCatalogue {
    pool: DbPool,
}

impl DieselUnitCatalogue {
    /// Create a new catalogue with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or update `entries`, keyed by unit id.
    ///
    /// Used at startup to seed the table from a catalogue file.
    pub async fn upsert_units(&self, entries: &[UnitPricing]) -> Result<usize, UnitCatalogueError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let rows: Vec<NewUnitRow<'_>> = entries.iter().map(NewUnitRow::from).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let written = diesel::insert_into(units::table)
            .values(&rows)
            .on_conflict(units::id)
            .do_update()
            .set((
                units::title.eq(excluded(units::title)),
                units::nightly_rate_krw.eq(excluded(units::nightly_rate_krw)),
                units::host_id.eq(excluded(units::host_id)),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        info!(units = written, "unit catalogue seeded");
        Ok(written)
    }
}

fn map_pool_error(error: PoolError) -> UnitCatalogueError {
    map_basic_pool_error(error, |message| UnitCatalogueError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> UnitCatalogueError {
    map_basic_diesel_error(
        error,
        UnitCatalogueError::query,
        UnitCatalogueError::connection,
    )
}

#[async_trait]
impl UnitCatalogue for DieselUnitCatalogue {
    async fn unit_pricing(&self, unit_id: &UnitId) -> Result<Option<UnitPricing>, UnitCatalogueError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UnitRow> = units::table
            .find(unit_id.as_ref())
            .select(UnitRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(UnitPricing::try_from)
            .transpose()
            .map_err(UnitCatalogueError::query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let err = map_pool_error(PoolError::build("bad url"));

        assert_eq!(err, UnitCatalogueError::connection("bad url"));
    }
}
