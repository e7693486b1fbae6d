use crate::model::StatusError;
use thiserror::*;

#[derive(Error, Debug)]
pub enum OperationError {
    #[error("Postback key {key} is not supported; only instance:{{id}} and connection:{{key}} are")]
    UnsupportedPostbackKey { key: String },

    #[error("Postback targets unknown resource {id}")]
    UnknownResource { id: String },

    #[error("Postback targets unknown connection {key}")]
    UnknownConnection { key: String },

    #[error("Postback value for {key} must be a map")]
    InvalidPayload { key: String },

    #[error(transparent)]
    StatusError(StatusError),
}

impl From<StatusError> for OperationError {
    fn from(value: StatusError) -> Self {
        OperationError::StatusError(value)
    }
}
