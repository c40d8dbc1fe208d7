use std::fmt;

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::RequestId;
use aws_smithy_types::error::{display::DisplayErrorContext, metadata::ProvideErrorMetadata};

use crate::dynamodb::value::UnsupportedAttribute;

/// Failure talking to one of the remote collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The service answered with an error.
    Service {
        code: String,
        message: String,
        request_id: Option<String>,
    },
    /// The request never produced a service answer (dispatch, timeout,
    /// response parsing).
    Transport(String),
    UnsupportedAttribute(UnsupportedAttribute),
    /// An item lacks one of its table's key attributes.
    MissingKey(String),
    /// A table description without a partition key.
    MissingKeySchema(String),
    /// A batch write still had unprocessed requests after every resend.
    Unprocessed { remaining: usize },
}

impl StoreError {
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + RequestId + std::error::Error + 'static,
        R: fmt::Debug,
    {
        if let Some(service_err) = err.as_service_error() {
            return StoreError::Service {
                code: service_err.code().unwrap_or("ServiceError").to_string(),
                message: service_err.message().unwrap_or("").trim().to_string(),
                request_id: service_err.request_id().map(str::to_string),
            };
        }
        StoreError::Transport(DisplayErrorContext(&err).to_string())
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Service {
                code,
                message,
                request_id,
            } => {
                if message.is_empty() {
                    write!(f, "{code}")?;
                } else {
                    write!(f, "{code}: {message}")?;
                }
                if let Some(request_id) = request_id {
                    write!(f, " (request id: {request_id})")?;
                }
                Ok(())
            }
            StoreError::Transport(detail) => write!(f, "request failed: {detail}"),
            StoreError::UnsupportedAttribute(err) => err.fmt(f),
            StoreError::MissingKey(detail) => f.write_str(detail),
            StoreError::MissingKeySchema(table) => {
                write!(f, "table {table} has no partition key")
            }
            StoreError::Unprocessed { remaining } => {
                write!(f, "{remaining} delete requests were left unprocessed")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<UnsupportedAttribute> for StoreError {
    fn from(err: UnsupportedAttribute) -> Self {
        StoreError::UnsupportedAttribute(err)
    }
}
