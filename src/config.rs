//! Configuration resolved at cold start.
//!
//! Each value is looked up first in the [`Parameters`] loaded from the
//! parameter store, then in the environment, then falls back to a default.

use std::time::Duration;
use tracing::Level;
use url::Url;

use crate::credential::DEFAULT_AUTH_TIMEOUT;
use crate::error::Error;
use crate::origin::{ANY_SUBDOMAIN, OriginGuard};
use crate::parameters::Parameters;
use crate::response::Cors;

/// Default name of the table.
pub const DEFAULT_TABLE_NAME: &str = "AppRatings";

/// How bearer credentials are checked.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AuthConfig {
    /// No credential is required.
    Disabled,
    /// Tokens are validated at an external endpoint.
    OpaqueToken {
        /// Validation endpoint.
        endpoint: Url,
        /// Time limit of a validation request.
        timeout: Duration,
    },
    /// Tokens are JWTs issued by a Cognito user pool.
    SignedToken {
        /// Region of the user pool.
        region: String,
        /// ID of the user pool.
        user_pool_id: String,
        /// App client ID that tokens must be issued for.
        client_id: String,
    },
}

/// Resolved configuration.
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Name of the table that stores reviews.
    pub table_name: String,
    /// Credential check.
    pub auth: AuthConfig,
    /// Origin check; `None` accepts any origin.
    pub origin_guard: Option<OriginGuard>,
    /// CORS headers of every response.
    ///
    /// Follows the origin guard if `CORS_ALLOW_ORIGIN` is not configured.
    pub cors: Cors,
}

// A setting that may come from the parameter store or the environment.
struct Setting {
    key: &'static str,
    env: &'static str,
}

const TABLE_NAME: Setting = Setting { key: "table_name", env: "DYNAMODB_TABLE" };
const AUTH_MODE: Setting = Setting { key: "auth_mode", env: "AUTH_MODE" };
const AUTH_ENDPOINT: Setting = Setting { key: "auth_endpoint", env: "AUTH_ENDPOINT" };
const AUTH_TIMEOUT: Setting = Setting {
    key: "auth_timeout_in_millis",
    env: "AUTH_TIMEOUT_IN_MILLIS",
};
const REGION: Setting = Setting { key: "region", env: "COGNITO_REGION" };
const USER_POOL_ID: Setting = Setting { key: "user_pool_id", env: "COGNITO_USER_POOL_ID" };
const CLIENT_ID: Setting = Setting { key: "client_id", env: "COGNITO_CLIENT_ID" };
const ALLOWED_DOMAIN: Setting = Setting { key: "allowed_domain", env: "ALLOWED_DOMAIN" };
const ALLOWED_SUBDOMAINS: Setting = Setting {
    key: "allowed_subdomains",
    env: "ALLOWED_SUBDOMAINS",
};
const CORS_ALLOW_ORIGIN: Setting = Setting {
    key: "cors_allow_origin",
    env: "CORS_ALLOW_ORIGIN",
};

impl Configuration {
    /// Resolves the configuration.
    ///
    /// `env` looks up an environment variable; pass
    /// `|name| std::env::var(name).ok()` in production.
    ///
    /// Fails with [`Error::BadConfiguration`] if a value is unusable or a
    /// value the selected auth mode needs is missing.
    pub fn resolve<F>(parameters: &Parameters, env: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |setting: &Setting| -> Option<String> {
            parameters.get(setting.key)
                .cloned()
                .or_else(|| env(setting.env))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |setting: &Setting| -> Result<String, Error> {
            lookup(setting).ok_or_else(|| Error::BadConfiguration(
                format!("{} ({}) must be set", setting.env, setting.key),
            ))
        };

        let table_name = lookup(&TABLE_NAME)
            .unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

        let auth_mode = lookup(&AUTH_MODE).unwrap_or_else(|| "none".to_string());
        let auth = match auth_mode.to_ascii_lowercase().as_str() {
            "none" => AuthConfig::Disabled,
            "token" => {
                let endpoint = require(&AUTH_ENDPOINT)?;
                let endpoint = Url::parse(&endpoint).map_err(|e| Error::BadConfiguration(
                    format!("invalid auth endpoint {endpoint}: {e}"),
                ))?;
                let timeout = match lookup(&AUTH_TIMEOUT) {
                    Some(millis) => millis.parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|e| Error::BadConfiguration(
                            format!("invalid auth timeout {millis}: {e}"),
                        ))?,
                    None => DEFAULT_AUTH_TIMEOUT,
                };
                AuthConfig::OpaqueToken { endpoint, timeout }
            }
            "jwt" => {
                let region = lookup(&REGION)
                    .or_else(|| env("AWS_REGION"))
                    .ok_or_else(|| Error::BadConfiguration(
                        format!("{} or AWS_REGION must be set", REGION.env),
                    ))?;
                AuthConfig::SignedToken {
                    region,
                    user_pool_id: require(&USER_POOL_ID)?,
                    client_id: require(&CLIENT_ID)?,
                }
            }
            other => return Err(Error::BadConfiguration(
                format!("unknown auth mode: {other}"),
            )),
        };

        let origin_guard = lookup(&ALLOWED_DOMAIN).map(|domain| {
            let subdomains = lookup(&ALLOWED_SUBDOMAINS)
                .unwrap_or_else(|| ANY_SUBDOMAIN.to_string());
            OriginGuard::new(domain, subdomains.split(','))
        });

        // a guarded domain allows its own subdomains unless told otherwise.
        let cors = match (lookup(&CORS_ALLOW_ORIGIN), origin_guard.as_ref()) {
            (Some(allow_origin), _) => Cors::new(&allow_origin)?,
            (None, Some(guard)) => {
                Cors::echoing_allowed_origin(&format!("https://{}", guard.domain()))?
            }
            (None, None) => Cors::default(),
        };

        Ok(Self { table_name, auth, origin_guard, cors })
    }
}

/// Parses the maximum log level.
///
/// Falls back to `INFO` if `value` is absent or not a level.
pub fn log_level(value: Option<&str>) -> Level {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(Level::INFO)
}
