//! Error types for the digest service.
//!
//! This module defines the central [`Error`] enum, which captures every
//! reportable failure on the request path. None of them are fatal: each one is
//! turned into a [`Reply`] with the matching status code through
//! `From<Error> for Reply`, so handlers can use `?` and let the dispatcher
//! render the result.
//!
//! ## Error Cases
//! - `MissingField` / `FieldTooLong`: the submitted form failed validation
//!   (precondition failed).
//! - `MalformedPath` / `InvalidHandle`: the path or its qualifier could not be
//!   interpreted (unprocessable entity).
//! - `NotFound`: the handle has no digest yet, or was never issued.
//! - `MethodNotAllowed` / `VerbNotAllowed`: nothing is routed for the request.
//! - `ServiceShutdown`: a request arrived after shutdown was initiated.
//! - `RuntimeUnavailable`: a submission was accepted outside any Tokio runtime,
//!   so there is nowhere to run the digest.

use crate::reply::{Reply, StatusCode};
use crate::router::Verb;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the digest service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A required form field is absent or empty.
    #[error("Missing required field `{field}`")]
    MissingField { field: String },

    /// A form field exceeds the configured maximum length.
    #[error("Field `{field}` is {len} bytes long, maximum is {max}")]
    FieldTooLong {
        field: String,
        len: usize,
        max: usize,
    },

    /// The request path does not have the shape the method expects.
    #[error("Malformed path: {reason}")]
    MalformedPath { reason: String },

    /// The handle qualifier is not a non-negative integer.
    #[error("Invalid handle `{raw}`")]
    InvalidHandle { raw: String },

    /// No digest is stored under the handle (yet).
    #[error("No digest for handle {handle}")]
    NotFound { handle: u64 },

    /// The verb is supported but nothing is routed for the method.
    #[error("Method `{method}` is not allowed")]
    MethodNotAllowed { method: String },

    /// The verb itself is not supported.
    #[error("Verb `{verb}` is not allowed")]
    VerbNotAllowed { verb: String },

    /// The service is draining and refuses new requests.
    #[error("Service is shutting down")]
    ServiceShutdown,

    /// No Tokio runtime is available to compute the digest.
    #[error("No async runtime available to compute digests")]
    RuntimeUnavailable,
}

impl Error {
    /// Status code reported to the client for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingField { .. } | Self::FieldTooLong { .. } => StatusCode::PRECONDITION_FAILED,
            Self::MalformedPath { .. } | Self::InvalidHandle { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } | Self::VerbNotAllowed { .. } => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            Self::ServiceShutdown | Self::RuntimeUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<Error> for Reply {
    fn from(err: Error) -> Self {
        let status = err.status();
        let allow = match err {
            Error::VerbNotAllowed { .. } => Some(Verb::SUPPORTED),
            _ => None,
        };
        Reply::error(status, err.to_string(), allow)
    }
}
