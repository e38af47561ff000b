//! Provides access to parameters in Parameter Store on AWS Systems Manager.
//!
//! Configuration may be kept in a single parameter (usually a `SecureString`)
//! whose value is a JSON object:
//!
//! ```json
//! {
//!   "table_name": "AppRatings",
//!   "auth_mode": "jwt",
//!   "user_pool_id": "ap-northeast-1_123456789",
//!   "client_id": "abcdefghijklmnopqrstuvwxyz",
//!   "allowed_domain": "example.com",
//!   "allowed_subdomains": ["app", "admin"]
//! }
//! ```
//!
//! Any key missing from the object is taken from the environment by
//! [`Configuration::resolve`](crate::config::Configuration::resolve).

use aws_sdk_ssm::error::DisplayErrorContext;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::Error;

/// Configuration values resolved from the parameter store.
pub type Parameters = HashMap<String, String>;

/// Resolves the parameters stored in a given parameter.
///
/// Fails soft: if the parameter cannot be fetched or parsed, the cause is
/// logged and an empty mapping is returned so that every value falls back
/// to the environment.
///
/// Values are never logged; only the keys are, at the debug level.
pub async fn resolve_parameters(
    ssm: &aws_sdk_ssm::Client,
    parameter_name: &str,
) -> Parameters {
    match load_parameters(ssm, parameter_name).await {
        Ok(parameters) => {
            debug!(
                keys = ?parameters.keys().collect::<Vec<_>>(),
                "resolved parameters from {parameter_name}",
            );
            parameters
        }
        Err(e) => {
            warn!("{e}; falling back to environment");
            Parameters::new()
        }
    }
}

/// Loads the JSON object stored in a given parameter.
pub async fn load_parameters(
    ssm: &aws_sdk_ssm::Client,
    parameter_name: &str,
) -> Result<Parameters, Error> {
    let value = ssm.get_parameter()
        .name(parameter_name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| Error::ConfigUnavailable(
            format!("getting SSM parameter {parameter_name}: {}", DisplayErrorContext(&e)),
        ))?
        .parameter
        .and_then(|p| p.value)
        .ok_or_else(|| Error::ConfigUnavailable(
            format!("missing SSM parameter value: {parameter_name}"),
        ))?;
    parse_parameters(&value)
        .ok_or_else(|| Error::ConfigUnavailable(
            format!("SSM parameter {parameter_name} is not a JSON object"),
        ))
}

// Parses a JSON object into flat string values.
//
// Arrays are joined with commas. Nested objects and nulls are dropped.
fn parse_parameters(value: &str) -> Option<Parameters> {
    let object = match serde_json::from_str::<Value>(value).ok()? {
        Value::Object(object) => object,
        _ => return None,
    };
    Some(object.into_iter()
        .filter_map(|(key, value)| flatten_value(value).map(|value| (key, value)))
        .collect())
}

fn flatten_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(values) => Some(values.into_iter()
            .filter_map(flatten_value)
            .collect::<Vec<_>>()
            .join(",")),
        Value::Null | Value::Object(_) => None,
    }
}
