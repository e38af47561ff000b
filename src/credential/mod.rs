//! Bearer credential validation.
//!
//! A request carries its credential in the `Authorization` header as
//! `Bearer <token>`. How the token is checked depends on the configured
//! [`AuthConfig`]:
//!
//! - [`OpaqueTokenValidator`] asks an external endpoint whether the token is
//!   good.
//! - [`SignedTokenValidator`] verifies the token as a JWT issued by a Cognito
//!   user pool, with the keys published by the user pool.

use async_trait::async_trait;
use lambda_http::http::{HeaderMap, header::AUTHORIZATION};
use thiserror::{Error as ThisError};

use crate::config::AuthConfig;
use crate::error::Error;

mod jwks;
mod opaque;
mod signed;
#[cfg(test)]
pub(crate) mod test_keys;

pub use jwks::{JwksKeySource, cognito_issuer, cognito_jwks_url};
pub use opaque::{DEFAULT_TIMEOUT as DEFAULT_AUTH_TIMEOUT, OpaqueTokenValidator};
pub use signed::{KeySource, SignedTokenValidator};

/// Why a credential was rejected.
///
/// None of these reaches the caller; every variant ends up with the same
/// 401 response.
#[derive(Debug, ThisError)]
pub enum CredentialError {
    /// Validation endpoint answered with a status other than 200.
    #[error("validation endpoint responded with status {0}")]
    Rejected(u16),
    /// Validation endpoint could not be reached in time.
    #[error("validation endpoint unreachable: {0}")]
    Transport(String),
    /// Token is not a JWT.
    #[error("malformed token: {0}")]
    MalformedToken(String),
    /// JWT header has no `kid`.
    #[error("token has no key ID")]
    MissingKeyId,
    /// No published key has the `kid`.
    #[error("unknown key ID: {0}")]
    UnknownKeyId(String),
    /// Published key set could not be obtained.
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),
    /// Signature or claims did not verify.
    #[error("token verification failed: {0}")]
    Verification(String),
}

/// Validator of bearer tokens.
#[async_trait]
pub trait CredentialValidator {
    /// Validates a given token.
    async fn validate(&self, token: &str) -> Result<(), CredentialError>;
}

/// Configured credential validator.
pub enum Authenticator {
    /// Validates tokens at an external endpoint.
    OpaqueToken(OpaqueTokenValidator),
    /// Verifies tokens as JWTs with keys of a Cognito user pool.
    SignedToken(SignedTokenValidator<JwksKeySource>),
}

impl Authenticator {
    /// Builds the authenticator for a given configuration.
    ///
    /// Returns `None` if authentication is disabled.
    pub fn from_config(config: &AuthConfig, http: reqwest::Client) -> Option<Self> {
        match config {
            AuthConfig::Disabled => None,
            AuthConfig::OpaqueToken { endpoint, timeout } => Some(Self::OpaqueToken(
                OpaqueTokenValidator::new(http, endpoint.clone(), *timeout),
            )),
            AuthConfig::SignedToken { region, user_pool_id, client_id } => {
                let keys = JwksKeySource::new(http, cognito_jwks_url(region, user_pool_id));
                Some(Self::SignedToken(SignedTokenValidator::new(
                    keys,
                    client_id,
                    Some(&cognito_issuer(region, user_pool_id)),
                )))
            }
        }
    }

    /// Returns the URL that tokens are checked against; the validation
    /// endpoint or the key set.
    pub fn validated_at(&self) -> &str {
        match self {
            Self::OpaqueToken(validator) => validator.endpoint().as_str(),
            Self::SignedToken(validator) => validator.keys().jwks_url(),
        }
    }
}

#[async_trait]
impl CredentialValidator for Authenticator {
    async fn validate(&self, token: &str) -> Result<(), CredentialError> {
        match self {
            Self::OpaqueToken(validator) => validator.validate(token).await,
            Self::SignedToken(validator) => validator.validate(token).await,
        }
    }
}

/// Extracts the bearer token from the `Authorization` header.
///
/// The scheme is case-insensitive. Fails with [`Error::AuthMissing`] if the
/// header is absent, has another scheme, or carries an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
    let value = headers.get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::AuthMissing)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(Error::AuthMissing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Error::AuthMissing);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::AuthMissing);
    }
    Ok(token)
}
