use registry::database::DatabaseError;

pub mod observation;
pub mod vehicle;

/// Postgres SQLSTATE for unique constraint violations. The registry relies
/// on seeing this as `UniqueViolation` to resolve create races.
const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(db_error) => {
            if db_error.code().as_deref() == Some(UNIQUE_VIOLATION) {
                DatabaseError::UniqueViolation
            } else {
                DatabaseError::Other(Box::new(sqlx::Error::Database(db_error)))
            }
        }
        _ => DatabaseError::Other(Box::new(why)),
    }
}
