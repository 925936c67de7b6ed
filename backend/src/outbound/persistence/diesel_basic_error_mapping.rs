//! Shared Diesel error classification for the repository adapters.
//!
//! Each adapter turns a [`DieselFailure`] into its own port error, choosing
//! which constraint violations carry domain meaning (duplicate course code,
//! duplicate email, a teacher who still owns courses).

use tracing::debug;

use super::pool::PoolError;

/// Coarse classification of a failed Diesel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    UniqueViolation,
    ForeignKeyViolation,
    Connection(&'static str),
    Query(&'static str),
}

/// Map pool errors into a repository-specific connection error constructor.
pub(crate) fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    connection(error.message)
}

/// Classify a Diesel error, logging the database detail at debug level.
pub(crate) fn classify(error: &diesel::result::Error) -> DieselFailure {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(%error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => DieselFailure::Query("record not found"),
        DieselError::QueryBuilderError(_) => DieselFailure::Query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            DieselFailure::UniqueViolation
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            DieselFailure::ForeignKeyViolation
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => {
            DieselFailure::Connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            DieselFailure::Query("concurrent update conflict")
        }
        _ => DieselFailure::Query("database error"),
    }
}

/// Map a Diesel error into query/connection constructors, treating every
/// constraint violation as a query failure.
pub(crate) fn map_basic_diesel_error<E, Q, C>(
    error: diesel::result::Error,
    query: Q,
    connection: C,
) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    match classify(&error) {
        DieselFailure::Connection(message) => connection(message),
        DieselFailure::Query(message) => query(message),
        DieselFailure::UniqueViolation => query("unique constraint violated"),
        DieselFailure::ForeignKeyViolation => query("foreign key constraint violated"),
    }
}

#[cfg(test)]
mod tests {
    //! Classification coverage for common Diesel failures.
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use crate::outbound::persistence::pool::PoolStage;
    use rstest::rstest;

    fn database_error(kind: DatabaseErrorKind) -> DieselError {
        DieselError::DatabaseError(kind, Box::new("detail".to_owned()))
    }

    #[rstest]
    #[case(database_error(DatabaseErrorKind::UniqueViolation), DieselFailure::UniqueViolation)]
    #[case(
        database_error(DatabaseErrorKind::ForeignKeyViolation),
        DieselFailure::ForeignKeyViolation
    )]
    #[case(
        database_error(DatabaseErrorKind::ClosedConnection),
        DieselFailure::Connection("database connection error")
    )]
    #[case(DieselError::NotFound, DieselFailure::Query("record not found"))]
    #[case(
        database_error(DatabaseErrorKind::SerializationFailure),
        DieselFailure::Query("concurrent update conflict")
    )]
    fn classifies_diesel_errors(#[case] error: DieselError, #[case] expected: DieselFailure) {
        assert_eq!(classify(&error), expected);
    }

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let error = PoolError::at(PoolStage::Checkout, "timed out");
        let mapped: String = map_basic_pool_error(error, |message| format!("connection: {message}"));
        assert_eq!(mapped, "connection: timed out");
    }

    #[rstest]
    fn violations_fall_back_to_query_errors() {
        let mapped: String = map_basic_diesel_error(
            database_error(DatabaseErrorKind::UniqueViolation),
            |m| format!("query: {m}"),
            |m| format!("connection: {m}"),
        );
        assert_eq!(mapped, "query: unique constraint violated");
    }
}
