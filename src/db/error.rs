use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("database query failed: {0}")]
    Query(String),
    #[error("transaction aborted by a concurrent update: {0}")]
    Conflict(String),
    #[error("database migration failed: {0}")]
    Migration(String),
}

impl From<DieselError> for DatabaseError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, info) => {
                DatabaseError::Conflict(info.message().to_string())
            }
            other => DatabaseError::Query(other.to_string()),
        }
    }
}
