//! Review payload.
//!
//! The request body is expected to be a JSON object in the following form.
//!
//! ```json
//! {
//!   "AppName": "Notes",
//!   "Rating": 5,
//!   "Description": "Great"
//! }
//! ```
//!
//! Older clients may send a body that is not JSON at all. Such a body is kept
//! as [`ReviewBody::RawString`] and validated like a body without fields
//! instead of being refused as unparsable.

use lambda_http::Body;
use serde_json::{Map, Value};
use thiserror::{Error as ThisError};

/// Maximum number of characters in an app name.
pub const MAX_APP_NAME_LENGTH: usize = 50;

/// Maximum number of characters in a description.
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Lowest rating.
pub const MIN_RATING: i64 = 1;

/// Highest rating.
pub const MAX_RATING: i64 = 5;

/// Field constraint violation.
///
/// The message is shown to the caller as is.
#[derive(Clone, Copy, Debug, ThisError, Eq, PartialEq)]
pub enum ValidationError {
    /// `AppName` is missing, empty, too long, or not a string.
    #[error("AppName is required and must be less than 50 characters")]
    AppName,
    /// `Rating` cannot be read as an integer.
    #[error("Rating must be a number between 1 and 5")]
    RatingNotANumber,
    /// `Rating` is an integer outside the range.
    #[error("Rating must be between 1 and 5")]
    RatingOutOfRange,
    /// `Description` is too long or not a string.
    #[error("Description must be less than 2000 characters")]
    Description,
}

/// Request body before validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ReviewBody {
    /// Body parsed into a JSON object.
    Parsed(Map<String, Value>),
    /// Body that could not be parsed.
    RawString(String),
}

impl ReviewBody {
    /// Interprets the body of an HTTP request.
    pub fn from_body(body: &Body) -> Self {
        match body {
            Body::Empty => ReviewBody::Parsed(Map::new()),
            Body::Text(text) => Self::from_text(text),
            Body::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => Self::from_text(text),
                Err(_) => ReviewBody::RawString(String::from_utf8_lossy(bytes).into_owned()),
            },
        }
    }

    /// Interprets a text body.
    ///
    /// Falls back to [`ReviewBody::RawString`] if `text` is not JSON.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(_) => ReviewBody::RawString(text.to_string()),
        }
    }

    /// Interprets an already structured body.
    ///
    /// A JSON string is parsed once more, because some clients encode the
    /// body twice. Any other non-object has no fields.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => ReviewBody::Parsed(fields),
            Value::String(text) => Self::from_text(&text),
            _ => ReviewBody::Parsed(Map::new()),
        }
    }

    fn field(&self, name: &str) -> Option<&Value> {
        match self {
            ReviewBody::Parsed(fields) => fields.get(name),
            ReviewBody::RawString(_) => None,
        }
    }

    /// Validates the fields.
    ///
    /// Checks `AppName`, `Rating`, and `Description` in this order and
    /// reports the first violation.
    pub fn validate(&self) -> Result<Review, ValidationError> {
        let app_name = match self.field("AppName") {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(ValidationError::AppName),
        };
        if app_name.is_empty() || app_name.chars().count() > MAX_APP_NAME_LENGTH {
            return Err(ValidationError::AppName);
        }

        let rating = match self.field("Rating") {
            None => 0,
            Some(value) => coerce_rating(value)?,
        };
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange);
        }

        let description = match self.field("Description") {
            None | Some(Value::Null) => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(ValidationError::Description),
        };
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ValidationError::Description);
        }

        Ok(Review {
            app_name: app_name.to_string(),
            // the range check above guarantees the conversion
            rating: rating as u8,
            description: description.to_string(),
        })
    }
}

// Reads a rating as an integer.
//
// Fractional numbers are truncated toward zero and numeric strings are
// parsed. `true` and `false` count as 1 and 0.
fn coerce_rating(value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::Number(n) => {
            if let Some(n) = n.as_i64() {
                Ok(n)
            } else if n.is_u64() {
                Err(ValidationError::RatingOutOfRange)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc())
                    .map(|f| if f < i64::MIN as f64 || f > i64::MAX as f64 {
                        // saturates to a value that is out of range anyway
                        i64::MAX
                    } else {
                        f as i64
                    })
                    .ok_or(ValidationError::RatingNotANumber)
            }
        }
        Value::String(s) => s.trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::RatingNotANumber),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(ValidationError::RatingNotANumber),
    }
}

/// Validated review.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Review {
    /// Name of the rated app.
    pub app_name: String,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Free text, possibly empty.
    pub description: String,
}
