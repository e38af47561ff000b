//! Signed token (JWT) verification.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tracing::debug;

use super::{CredentialError, CredentialValidator};

/// Source of the public keys that verify tokens.
#[async_trait]
pub trait KeySource {
    /// Returns the key identified by a given key ID.
    async fn decoding_key(&self, key_id: &str) -> Result<DecodingKey, CredentialError>;
}

// Claims worth logging. Other claims are checked by `Validation`.
#[derive(Clone, Deserialize)]
struct Claims {
    sub: Option<String>,
}

/// Validator of RS256 JWTs.
///
/// A token is valid if
/// - its header names a key ID that the [`KeySource`] knows
/// - the signature verifies with that key
/// - `exp` is in the future, with no leeway
/// - `aud` matches the audience
/// - `iss` matches the issuer, if one is configured
pub struct SignedTokenValidator<K> {
    keys: K,
    validation: Validation,
}

impl<K> SignedTokenValidator<K> {
    /// Creates a validator that accepts tokens for a given audience.
    pub fn new(keys: K, audience: &str, issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        validation.set_audience(&[audience]);
        let mut required_claims = vec!["exp", "aud"];
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
            required_claims.push("iss");
        }
        validation.set_required_spec_claims(&required_claims);
        Self { keys, validation }
    }

    /// Returns the key source.
    pub fn keys(&self) -> &K {
        &self.keys
    }
}

#[async_trait]
impl<K> CredentialValidator for SignedTokenValidator<K>
where
    K: KeySource + Send + Sync,
{
    async fn validate(&self, token: &str) -> Result<(), CredentialError> {
        let header = decode_header(token)
            .map_err(|e| CredentialError::MalformedToken(e.to_string()))?;
        let key_id = header.kid.ok_or(CredentialError::MissingKeyId)?;
        let key = self.keys.decoding_key(&key_id).await?;
        let token = decode::<Claims>(token, &key, &self.validation)
            .map_err(|e| CredentialError::Verification(e.to_string()))?;
        debug!(sub = ?token.claims.sub, "verified token signed with {key_id}");
        Ok(())
    }
}
