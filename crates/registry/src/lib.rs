use std::error::Error;

use crate::database::DatabaseError;

pub mod database;
pub mod ingest;
pub mod memory;
pub mod registry;

#[derive(Debug)]
pub enum RequestError {
    /// A required field is missing or malformed. Never retried.
    Validation(String),
    NotFound,
    Other(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }
}

impl From<DatabaseError> for RequestError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound => Self::NotFound,
            DatabaseError::Other(why) => Self::Other(why),
            // unique violations are absorbed by the registry; one slipping
            // through here is a server-side fault, not a client error.
            why @ DatabaseError::UniqueViolation => Self::other(why),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;
