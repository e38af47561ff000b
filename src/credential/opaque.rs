//! Opaque token validation at an external endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{CredentialError, CredentialValidator};

/// Default time limit of a validation request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Validator that forwards a token to an endpoint.
///
/// The endpoint receives a `GET` request with the token as
/// `Authorization: Bearer <token>`, and the token is valid if and only if the
/// endpoint answers with 200 within the time limit.
pub struct OpaqueTokenValidator {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl OpaqueTokenValidator {
    /// Creates a validator.
    pub fn new(http: reqwest::Client, endpoint: Url, timeout: Duration) -> Self {
        Self { http, endpoint, timeout }
    }

    /// Returns the validation endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CredentialValidator for OpaqueTokenValidator {
    async fn validate(&self, token: &str) -> Result<(), CredentialError> {
        let res = self.http.get(self.endpoint.clone())
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;
        let status = res.status();
        debug!("validation endpoint responded with {status}");
        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(CredentialError::Rejected(status.as_u16()))
        }
    }
}
