//! Common error.

use thiserror::{Error as ThisError};

use crate::credential::CredentialError;
use crate::origin::OriginError;
use crate::review::ValidationError;
use crate::store::StoreError;

/// Common error.
///
/// Every failure of the rating pipeline ends up as one of these.
/// See [`ErrorResponse`](crate::error_response::ErrorResponse) for the HTTP
/// status each one maps to.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Configuration could not be fetched from the parameter store.
    ///
    /// Never fatal; the caller falls back to the environment.
    #[error("configuration unavailable: {0}")]
    ConfigUnavailable(String),
    /// Configuration is present but unusable.
    #[error("bad configuration: {0}")]
    BadConfiguration(String),
    /// No bearer credential in the `Authorization` header.
    #[error("missing or malformed Authorization header")]
    AuthMissing,
    /// Bearer credential was rejected.
    #[error("invalid credential: {0}")]
    AuthInvalid(#[from] CredentialError),
    /// Origin is missing or not allowed.
    #[error("origin rejected: {0}")]
    OriginRejected(#[from] OriginError),
    /// Request body violates a field constraint.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
    /// Review could not be written.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    /// Anything else.
    #[error("unexpected: {0}")]
    Unexpected(String),
}
