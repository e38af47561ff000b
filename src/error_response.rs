//! Error response.

use lambda_http::{Body, Error, Response, http::StatusCode};
use tracing::error;

use crate::error::Error as AppError;
use crate::response::{Cors, MessageBody, json_response};

/// Error response.
///
/// A Rust runtime built with [`lambda_http`](https://docs.rs/lambda_http/latest/lambda_http/)
/// responds with a 500 error and exits if the service function returns an
/// error result.
/// To answer with a specific status code and keep the runtime running, the
/// service function returns an OK result with a response that has the status
/// code.
///
/// The message of each variant is the one the caller sees, so it must not
/// contain internal details.
///
/// #### Generating a response
///
/// ```
/// # use app_ratings::error_response::ErrorResponse;
/// # use app_ratings::response::Cors;
/// let res = ErrorResponse::bad_request("Bad request")
///     .into_response(&Cors::default())
///     .unwrap();
/// assert_eq!(res.status(), 400);
/// ```
///
/// #### Converting a pipeline error
///
/// ```
/// # use app_ratings::error::Error;
/// # use app_ratings::error_response::ErrorResponse;
/// let res: ErrorResponse = Error::AuthMissing.into();
/// assert!(matches!(res, ErrorResponse::Unauthorized(_)));
/// ```
#[derive(Debug)]
pub enum ErrorResponse {
    /// 400 Bad Request.
    BadRequest(String),
    /// 401 Unauthorized.
    Unauthorized(String),
    /// 403 Forbidden.
    Forbidden(String),
    /// 500 Internal Server Error with a known cause.
    Internal(String),
    /// Others which will end up with 500 Internal Server Error and a generic
    /// message.
    Unhandled(Error),
}

impl ErrorResponse {
    /// Creates [`ErrorResponse::BadRequest`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Creates [`ErrorResponse::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Creates [`ErrorResponse::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates [`ErrorResponse::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the status code of the response.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorResponse::BadRequest(_) => StatusCode::BAD_REQUEST,
            ErrorResponse::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ErrorResponse::Forbidden(_) => StatusCode::FORBIDDEN,
            ErrorResponse::Internal(_) |
            ErrorResponse::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the JSON response with the CORS headers.
    ///
    /// Fails only if the response cannot be built at all.
    pub fn into_response(self, cors: &Cors) -> Result<Response<Body>, Error> {
        let status = self.status();
        let message = match self {
            ErrorResponse::BadRequest(msg) |
            ErrorResponse::Unauthorized(msg) |
            ErrorResponse::Forbidden(msg) |
            ErrorResponse::Internal(msg) => msg,
            // prevents the internal error details from being exposed to the client
            ErrorResponse::Unhandled(e) => {
                error!("{e:?}");
                "Server error".to_string()
            }
        };
        json_response(status, &MessageBody::message(&message), cors)
    }
}

impl From<Error> for ErrorResponse {
    fn from(e: Error) -> Self {
        ErrorResponse::Unhandled(e)
    }
}

impl From<AppError> for ErrorResponse {
    fn from(e: AppError) -> Self {
        match e {
            AppError::AuthMissing | AppError::AuthInvalid(_) =>
                ErrorResponse::unauthorized("Unauthorized"),
            AppError::OriginRejected(_) =>
                ErrorResponse::forbidden("Forbidden: origin not allowed"),
            AppError::ValidationFailed(e) =>
                ErrorResponse::bad_request(e.to_string()),
            AppError::StoreUnavailable(_) =>
                ErrorResponse::internal("Database error"),
            AppError::ConfigUnavailable(_) |
            AppError::BadConfiguration(_) |
            AppError::Unexpected(_) => ErrorResponse::Unhandled(e.into()),
        }
    }
}
