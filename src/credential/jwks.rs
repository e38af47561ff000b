//! Keys published as a JSON Web Key Set.

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{CredentialError, KeySource};

/// Time limit of a key set request.
pub const KEY_SET_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns the issuer of tokens from a Cognito user pool.
pub fn cognito_issuer(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}")
}

/// Returns the URL of the key set of a Cognito user pool.
pub fn cognito_jwks_url(region: &str, user_pool_id: &str) -> String {
    format!("{}/.well-known/jwks.json", cognito_issuer(region, user_pool_id))
}

/// Key source backed by a JWKS URL.
///
/// Keys are cached by key ID for the life of the instance, which usually
/// spans many invocations of a warm Lambda. A key ID missing from the cache
/// triggers a refetch so that rotated keys are picked up.
pub struct JwksKeySource {
    http: reqwest::Client,
    jwks_url: String,
    keys: RwLock<HashMap<String, Jwk>>,
}

impl JwksKeySource {
    /// Creates a key source for a given JWKS URL.
    ///
    /// Nothing is fetched until a key is requested.
    pub fn new(http: reqwest::Client, jwks_url: impl Into<String>) -> Self {
        Self {
            http,
            jwks_url: jwks_url.into(),
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    async fn fetch(&self) -> Result<JwkSet, CredentialError> {
        let res = self.http.get(&self.jwks_url)
            .timeout(KEY_SET_TIMEOUT)
            .send()
            .await
            .map_err(|e| CredentialError::KeySetUnavailable(e.to_string()))?;
        if !res.status().is_success() {
            return Err(CredentialError::KeySetUnavailable(
                format!("{} responded with {}", self.jwks_url, res.status()),
            ));
        }
        res.json::<JwkSet>()
            .await
            .map_err(|e| CredentialError::KeySetUnavailable(e.to_string()))
    }
}

#[async_trait]
impl KeySource for JwksKeySource {
    async fn decoding_key(&self, key_id: &str) -> Result<DecodingKey, CredentialError> {
        {
            let keys = self.keys.read().await;
            if let Some(jwk) = keys.get(key_id) {
                return to_decoding_key(jwk);
            }
        }
        info!("fetching key set for key ID {key_id}");
        let jwks = self.fetch().await?;
        let mut keys = self.keys.write().await;
        for jwk in jwks.keys {
            match jwk.common.key_id.clone() {
                Some(kid) => {
                    keys.insert(kid, jwk);
                }
                None => warn!("skipping key without key ID"),
            }
        }
        keys.get(key_id)
            .ok_or_else(|| CredentialError::UnknownKeyId(key_id.to_string()))
            .and_then(to_decoding_key)
    }
}

fn to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, CredentialError> {
    DecodingKey::from_jwk(jwk)
        .map_err(|e| CredentialError::KeySetUnavailable(format!("unusable key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tiny_http::{Header, Response, Server};

    use crate::credential::{CredentialValidator, SignedTokenValidator};
    use crate::credential::test_keys::{
        CLIENT_ID,
        ISSUER,
        KEY_ID,
        OTHER_KEY_ID,
        PRIVATE_KEY_PEM,
        jwks_document,
        mint,
        valid_claims,
    };

    // Serves the test key set and counts the requests.
    fn spawn_jwks_server() -> (String, Arc<AtomicUsize>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        thread::spawn(move || {
            for request in server.incoming_requests() {
                counter.fetch_add(1, Ordering::SeqCst);
                let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                    .unwrap();
                let _ = request.respond(
                    Response::from_string(jwks_document()).with_header(content_type),
                );
            }
        });
        (format!("http://{addr}/.well-known/jwks.json"), hits)
    }

    #[test]
    fn cognito_urls_should_be_derived_from_user_pool() {
        assert_eq!(
            cognito_issuer("ap-northeast-1", "ap-northeast-1_TestPool"),
            ISSUER,
        );
        assert_eq!(
            cognito_jwks_url("ap-northeast-1", "ap-northeast-1_TestPool"),
            format!("{ISSUER}/.well-known/jwks.json"),
        );
    }

    #[tokio::test]
    async fn decoding_key_should_cache_key_set() {
        let (url, hits) = spawn_jwks_server();
        let keys = JwksKeySource::new(reqwest::Client::new(), url);
        assert!(keys.decoding_key(KEY_ID).await.is_ok());
        assert!(keys.decoding_key(KEY_ID).await.is_ok());
        assert!(keys.decoding_key(OTHER_KEY_ID).await.is_ok());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn decoding_key_should_refetch_for_unknown_key_id() {
        let (url, hits) = spawn_jwks_server();
        let keys = JwksKeySource::new(reqwest::Client::new(), url);
        assert!(keys.decoding_key(KEY_ID).await.is_ok());
        assert!(matches!(
            keys.decoding_key("rotated-in").await,
            Err(CredentialError::UnknownKeyId(_)),
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn decoding_key_should_fail_if_key_set_is_unavailable() {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = request.respond(Response::empty(503));
            }
        });
        let keys = JwksKeySource::new(
            reqwest::Client::new(),
            format!("http://{addr}/.well-known/jwks.json"),
        );
        assert!(matches!(
            keys.decoding_key(KEY_ID).await,
            Err(CredentialError::KeySetUnavailable(_)),
        ));
    }

    #[tokio::test]
    async fn signed_token_validator_should_verify_with_published_keys() {
        let (url, _) = spawn_jwks_server();
        let validator = SignedTokenValidator::new(
            JwksKeySource::new(reqwest::Client::new(), url),
            CLIENT_ID,
            Some(ISSUER),
        );
        let token = mint(&valid_claims(), Some(KEY_ID), PRIVATE_KEY_PEM);
        assert!(validator.validate(&token).await.is_ok());

        // signed with key A but claims to be key B
        let token = mint(&valid_claims(), Some(OTHER_KEY_ID), PRIVATE_KEY_PEM);
        assert!(matches!(
            validator.validate(&token).await,
            Err(CredentialError::Verification(_)),
        ));
    }
}
