//! Response building.
//!
//! Every response, successful or not, is JSON and carries the CORS
//! headers.

use lambda_http::{
    Body,
    Error,
    Response,
    http::{
        HeaderValue,
        StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
            CONTENT_TYPE,
            VARY,
        },
        response::Builder,
    },
};
use serde::Serialize;

use crate::error::Error as AppError;
use crate::origin::OriginGuard;

/// Value of `Access-Control-Allow-Headers`.
pub const ALLOW_HEADERS: &str = "Content-Type,Authorization";

/// Value of `Access-Control-Allow-Methods`.
pub const ALLOW_METHODS: &str = "POST,OPTIONS";

/// CORS header set.
///
/// `Access-Control-Allow-Origin` is either a fixed value or, for a guarded
/// domain, the request's own origin once the [`OriginGuard`] allows it.
#[derive(Clone, Debug)]
pub struct Cors {
    allow_origin: HeaderValue,
    echo_allowed_origin: bool,
}

impl Cors {
    /// Creates a CORS header set that allows a given origin.
    ///
    /// Fails if `allow_origin` cannot be a header value.
    pub fn new(allow_origin: &str) -> Result<Self, AppError> {
        Ok(Self {
            allow_origin: to_header_value(allow_origin)?,
            echo_allowed_origin: false,
        })
    }

    /// Creates a CORS header set that allows the request's origin if the
    /// origin guard does.
    ///
    /// Other requests get `fallback`.
    pub fn echoing_allowed_origin(fallback: &str) -> Result<Self, AppError> {
        Ok(Self {
            allow_origin: to_header_value(fallback)?,
            echo_allowed_origin: true,
        })
    }

    /// Returns the value of `Access-Control-Allow-Origin`.
    pub fn allow_origin(&self) -> &HeaderValue {
        &self.allow_origin
    }

    /// Returns if the request's origin is allowed instead of a fixed value.
    pub fn echoes_allowed_origin(&self) -> bool {
        self.echo_allowed_origin
    }

    /// Returns the header set for a request from a given origin.
    pub fn for_origin(
        &self,
        origin: Option<&HeaderValue>,
        origin_guard: Option<&OriginGuard>,
    ) -> Cors {
        if !self.echo_allowed_origin {
            return self.clone();
        }
        let allowed = origin.filter(|origin| match origin_guard {
            Some(guard) => guard.check(origin.to_str().ok()).is_ok(),
            None => true,
        });
        match allowed {
            Some(origin) => Self {
                allow_origin: origin.clone(),
                echo_allowed_origin: true,
            },
            None => self.clone(),
        }
    }

    fn apply(&self, builder: Builder) -> Builder {
        let builder = builder
            .header(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone())
            .header(ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS)
            .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS);
        if self.echo_allowed_origin {
            // caches must not share a response across origins.
            builder.header(VARY, "Origin")
        } else {
            builder
        }
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            echo_allowed_origin: false,
        }
    }
}

fn to_header_value(allow_origin: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(allow_origin)
        .map_err(|_| AppError::BadConfiguration(
            format!("invalid CORS allow-origin: {allow_origin}"),
        ))
}

/// Body of every response.
#[derive(Clone, Debug, Serialize)]
pub struct MessageBody<'a, T> {
    /// Human readable outcome.
    pub message: &'a str,
    /// Stored item, only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<&'a T>,
}

impl<'a> MessageBody<'a, ()> {
    /// Creates a body with a message only.
    pub fn message(message: &'a str) -> Self {
        Self { message, item: None }
    }
}

/// Renders a JSON response with the CORS headers.
pub fn json_response(
    status: StatusCode,
    body: &impl Serialize,
    cors: &Cors,
) -> Result<Response<Body>, Error> {
    let body = serde_json::to_string(body)?;
    Ok(cors.apply(Response::builder())
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))?)
}

/// Renders the 200 response to a saved item.
pub fn saved<T: Serialize>(item: &T, cors: &Cors) -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::OK,
        &MessageBody {
            message: "Rating saved successfully",
            item: Some(item),
        },
        cors,
    )
}

/// Renders the response to a CORS preflight request.
pub fn preflight(cors: &Cors) -> Result<Response<Body>, Error> {
    Ok(cors.apply(Response::builder())
        .status(StatusCode::OK)
        .body(Body::Empty)?)
}
