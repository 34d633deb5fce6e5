//! Shared Diesel error mapping for the reservation adapters.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Name of the exclusion constraint that forbids overlapping active stays.
pub const NO_OVERLAP_CONSTRAINT: &str = "reservations_no_overlap";

/// Map pool errors into a port-specific connection error constructor.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map common Diesel error variants into query/connection constructors.
///
/// Messages handed to the constructors are fixed strings; the database's own
/// text is only logged at debug level.
pub fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand,
            _,
        ) => connection("database connection error"),
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            query("transaction could not be serialized")
        }
        DieselError::DatabaseError(_, _) => query("database error"),
        _ => query("database error"),
    }
}

/// Whether PostgreSQL aborted a serializable transaction that may be retried.
pub fn is_serialization_failure(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _)
    )
}

/// Whether `error` was raised by the named constraint.
pub fn violates_constraint(error: &DieselError, constraint: &str) -> bool {
    match error {
        DieselError::DatabaseError(_, info) => info.constraint_name() == Some(constraint),
        _ => false,
    }
}

/// Whether `error` is a unique violation, whichever constraint raised it.
pub fn is_unique_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, PartialEq, Eq)]
    enum Mapped {
        Query(&'static str),
        Connection(&'static str),
    }

    fn map(error: DieselError) -> Mapped {
        map_basic_diesel_error(error, Mapped::Query, Mapped::Connection)
    }

    fn database_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new("boom".to_owned()))
    }

    #[rstest]
    #[case(DatabaseErrorKind::ClosedConnection)]
    #[case(DatabaseErrorKind::UnableToSendCommand)]
    fn lost_connections_map_to_connection_errors(#[case] kind: DatabaseErrorKind) {
        assert_eq!(
            map(database_error(kind)),
            Mapped::Connection("database connection error")
        );
    }

    #[rstest]
    fn other_database_errors_hide_the_server_message() {
        assert_eq!(
            map(database_error(DatabaseErrorKind::CheckViolation)),
            Mapped::Query("database error")
        );
    }

    #[rstest]
    fn serialization_failures_are_retryable() {
        let error = database_error(DatabaseErrorKind::SerializationFailure);

        assert!(is_serialization_failure(&error));
        assert!(!is_serialization_failure(&DieselError::NotFound));
    }

    #[rstest]
    fn string_errors_carry_no_constraint_name() {
        let error = database_error(DatabaseErrorKind::Unknown);

        assert!(!violates_constraint(&error, NO_OVERLAP_CONSTRAINT));
        assert!(is_unique_violation(&database_error(DatabaseErrorKind::UniqueViolation)));
    }

    #[rstest]
    fn pool_errors_keep_their_message() {
        let mapped = map_basic_pool_error(PoolError::checkout("refused"), |message| message);
        assert_eq!(mapped, "refused");
    }
}
