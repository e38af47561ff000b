//! Submission of app ratings.
//!
//! This application is intended to run as an AWS Lambda function behind an
//! API Gateway proxy integration.
//!
//! You may configure the following environment variables:
//! - `CONFIG_PARAMETER_PATH`: name of the parameter in the Parameter Store on
//!   AWS Systems Manager that stores the configuration as a JSON object.
//!   Keys in the object take precedence over the environment variables below.
//! - `DYNAMODB_TABLE`: name of the DynamoDB table that stores ratings.
//!   `AppRatings` by default.
//! - `AUTH_MODE`: `none` (default), `token` or `jwt`
//! - `AUTH_ENDPOINT`: URL that validates opaque tokens. Required for `token`.
//! - `AUTH_TIMEOUT_IN_MILLIS`: time limit of a token validation. 5000 ms by
//!   default.
//! - `COGNITO_REGION`: region of the Cognito user pool. `AWS_REGION` by
//!   default.
//! - `COGNITO_USER_POOL_ID`: ID of the Cognito user pool. Required for `jwt`.
//! - `COGNITO_CLIENT_ID`: app client ID that tokens must be issued for.
//!   Required for `jwt`.
//! - `ALLOWED_DOMAIN`: domain whose subdomains may call the endpoint. Any
//!   origin is allowed if omitted.
//! - `ALLOWED_SUBDOMAINS`: comma-separated subdomains allowed under
//!   `ALLOWED_DOMAIN`. `*` (any subdomain) by default.
//! - `CORS_ALLOW_ORIGIN`: value of `Access-Control-Allow-Origin`. If
//!   omitted, an origin allowed under `ALLOWED_DOMAIN` is echoed back, or `*`
//!   without `ALLOWED_DOMAIN`.
//! - `LOG_LEVEL`: maximum log level. `INFO` by default.
//!
//! ## Endpoint
//!
//! ### `POST`
//!
//! Saves a rating. The request body is a JSON object:
//!
//! ```json
//! {
//!   "AppName": "Notes",
//!   "Rating": 5,
//!   "Description": "Great"
//! }
//! ```
//!
//! The response body is a JSON object with the saved item:
//!
//! ```json
//! {
//!   "message": "Rating saved successfully",
//!   "item": {
//!     "AppName": "Notes",
//!     "CreatedAt": "2025-01-01T00:00:00Z",
//!     "CreatedAtTimestamp": 1735689600,
//!     "Rating": 5,
//!     "Description": "Great",
//!     "RatingId": "Notes_1735689600000"
//!   }
//! }
//! ```
//!
//! Fails with
//! - 403 if the origin is not allowed
//! - 401 if the bearer token is missing or invalid
//! - 400 if a field is invalid
//! - 500 if the rating cannot be saved
//!
//! ### `OPTIONS`
//!
//! Answers a CORS preflight request.

use lambda_http::{
    Body,
    Error,
    Request,
    Response,
    http::{Method, header::ORIGIN},
    run,
    service_fn,
};
use std::env;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{info, warn};

use app_ratings::config::{Configuration, log_level};
use app_ratings::credential::{Authenticator, CredentialValidator, bearer_token};
use app_ratings::error::Error as AppError;
use app_ratings::error_response::ErrorResponse;
use app_ratings::origin::OriginGuard;
use app_ratings::parameters::{Parameters, resolve_parameters};
use app_ratings::response::{Cors, preflight, saved};
use app_ratings::review::ReviewBody;
use app_ratings::store::{DynamoDbReviewStore, ReviewRecord, ReviewStore};

// State shared among Lambda invocations.
#[cfg_attr(test, derive(derive_builder::Builder))]
#[cfg_attr(test, builder(setter(into), pattern = "owned"))]
struct SharedState<V, S> {
    #[cfg_attr(test, builder(default))]
    validator: Option<V>,
    store: S,
    #[cfg_attr(test, builder(default))]
    origin_guard: Option<OriginGuard>,
    #[cfg_attr(test, builder(default))]
    cors: Cors,
}

impl SharedState<Authenticator, DynamoDbReviewStore> {
    async fn new() -> Result<Self, Error> {
        let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let parameters = match env::var("CONFIG_PARAMETER_PATH") {
            Ok(name) => resolve_parameters(&aws_sdk_ssm::Client::new(&aws), &name).await,
            Err(_) => Parameters::new(),
        };
        let config = Configuration::resolve(&parameters, |name| env::var(name).ok())?;
        let http = reqwest::Client::builder().build()?;
        let validator = Authenticator::from_config(&config.auth, http);
        let store = DynamoDbReviewStore::new(
            aws_sdk_dynamodb::Client::new(&aws),
            config.table_name,
        );
        info!(
            table = %store.table_name(),
            auth = ?config.auth,
            validated_at = ?validator.as_ref().map(Authenticator::validated_at),
            origin_guard = ?config.origin_guard.as_ref().map(OriginGuard::domain),
            cors_allow_origin = ?config.cors.allow_origin(),
            "resolved configuration",
        );
        Ok(Self {
            validator,
            store,
            origin_guard: config.origin_guard,
            cors: config.cors,
        })
    }
}

async fn function_handler<V, S>(
    shared_state: Arc<SharedState<V, S>>,
    event: Request,
) -> Result<Response<Body>, Error>
where
    V: CredentialValidator + Send + Sync,
    S: ReviewStore + Send + Sync,
{
    let cors = shared_state.cors.for_origin(
        event.headers().get(ORIGIN),
        shared_state.origin_guard.as_ref(),
    );
    if event.method() == Method::OPTIONS {
        return preflight(&cors);
    }
    match submit_rating(&shared_state, &event).await {
        Ok(record) => saved(&record, &cors),
        Err(e) => ErrorResponse::from(e).into_response(&cors),
    }
}

// Runs the guards in order and saves the rating if all of them pass.
async fn submit_rating<V, S>(
    shared_state: &SharedState<V, S>,
    event: &Request,
) -> Result<ReviewRecord, AppError>
where
    V: CredentialValidator + Send + Sync,
    S: ReviewStore + Send + Sync,
{
    if let Some(origin_guard) = shared_state.origin_guard.as_ref() {
        let origin = event.headers().get(ORIGIN).and_then(|v| v.to_str().ok());
        origin_guard.check(origin)
            .inspect_err(|e| warn!("rejected origin: {e}"))?;
    }
    if let Some(validator) = shared_state.validator.as_ref() {
        let token = bearer_token(event.headers())
            .inspect_err(|e| warn!("{e}"))?;
        validator.validate(token).await
            .inspect_err(|e| warn!("rejected credential: {e}"))?;
    }
    let review = ReviewBody::from_body(event.body()).validate()
        .inspect_err(|e| info!("invalid rating: {e}"))?;
    let record = ReviewRecord::new(review, SystemTime::now())?;
    shared_state.store.put_review(&record).await?;
    info!("saved rating: {}", record.rating_id);
    Ok(record)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(log_level(env::var("LOG_LEVEL").ok().as_deref()))
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let shared_state = Arc::new(SharedState::new().await?);
    run(service_fn(|req| async {
        function_handler(shared_state.clone(), req).await
    })).await
}
