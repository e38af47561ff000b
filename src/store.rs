//! Review store on DynamoDB.
//!
//! Every accepted review becomes a new item in the table:
//!
//! | Attribute | Type | Value |
//! |---|---|---|
//! | `AppName` | S | name of the app |
//! | `CreatedAt` | S | ISO-8601 UTC time of the write |
//! | `CreatedAtTimestamp` | N | Unix time of the write in seconds |
//! | `Rating` | N | 1 to 5 |
//! | `Description` | S | free text, may be empty |
//! | `RatingId` | S | `{AppName}_{Unix time in milliseconds}` |
//!
//! The key schema of the table is owned by the deployment. Items are written
//! unconditionally; nothing is ever updated or deleted.

use async_trait::async_trait;
use aws_sdk_dynamodb::{
    error::DisplayErrorContext,
    primitives::{DateTime, DateTimeFormat},
    types::AttributeValue,
};
use serde::Serialize;
use std::collections::HashMap;
use std::time::SystemTime;
use thiserror::{Error as ThisError};
use tracing::{error, info, warn};

use crate::error::Error;
use crate::review::Review;
use crate::sdk_error_ext::SdkErrorExt as _;

/// Failure of a write.
#[derive(Debug, ThisError)]
pub enum StoreError {
    /// Store is temporarily over capacity or unavailable.
    #[error("throttled: {0}")]
    Throttled(String),
    /// Any other failure, including oversized items and missing tables.
    #[error("put item failed: {0}")]
    Failed(String),
}

/// Review stamped for persistence.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReviewRecord {
    /// Name of the rated app.
    pub app_name: String,
    /// ISO-8601 UTC time of the write.
    pub created_at: String,
    /// Unix time of the write in seconds.
    pub created_at_timestamp: i64,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Free text.
    pub description: String,
    /// `{AppName}_{Unix time in milliseconds}`.
    ///
    /// Distinguishes ratings of the same app, but it is not the key of the
    /// table.
    pub rating_id: String,
}

impl ReviewRecord {
    /// Stamps a review with a given time.
    pub fn new(review: Review, now: SystemTime) -> Result<Self, Error> {
        let now = DateTime::from(now);
        let created_at = now.fmt(DateTimeFormat::DateTime)
            .map_err(|e| Error::Unexpected(format!("formatting timestamp: {e}")))?;
        let millis = now.to_millis()
            .map_err(|e| Error::Unexpected(format!("converting timestamp: {e}")))?;
        Ok(Self {
            rating_id: format!("{}_{}", review.app_name, millis),
            app_name: review.app_name,
            created_at,
            created_at_timestamp: now.secs(),
            rating: review.rating,
            description: review.description,
        })
    }

    /// Converts into DynamoDB attributes.
    pub fn to_item(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("AppName".into(), AttributeValue::S(self.app_name.clone())),
            ("CreatedAt".into(), AttributeValue::S(self.created_at.clone())),
            (
                "CreatedAtTimestamp".into(),
                AttributeValue::N(self.created_at_timestamp.to_string()),
            ),
            ("Rating".into(), AttributeValue::N(self.rating.to_string())),
            ("Description".into(), AttributeValue::S(self.description.clone())),
            ("RatingId".into(), AttributeValue::S(self.rating_id.clone())),
        ])
    }
}

/// Destination of reviews.
#[async_trait]
pub trait ReviewStore {
    /// Writes a record as a new row.
    async fn put_review(&self, record: &ReviewRecord) -> Result<(), StoreError>;
}

/// [`ReviewStore`] backed by a DynamoDB table.
#[derive(Clone, Debug)]
pub struct DynamoDbReviewStore {
    dynamodb: aws_sdk_dynamodb::Client,
    table_name: String,
}

impl DynamoDbReviewStore {
    /// Creates a store that writes to a given table.
    pub fn new(dynamodb: aws_sdk_dynamodb::Client, table_name: impl Into<String>) -> Self {
        Self {
            dynamodb,
            table_name: table_name.into(),
        }
    }

    /// Returns the name of the table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl ReviewStore for DynamoDbReviewStore {
    async fn put_review(&self, record: &ReviewRecord) -> Result<(), StoreError> {
        info!("putting rating: {}", record.rating_id);
        self.dynamodb
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_item()))
            .send()
            .await
            .map_err(|e| {
                let detail = DisplayErrorContext(&e).to_string();
                if e.is_retryable() {
                    warn!(table = %self.table_name, "throttled putting rating: {detail}");
                    StoreError::Throttled(detail)
                } else {
                    error!(table = %self.table_name, "failed to put rating: {detail}");
                    StoreError::Failed(detail)
                }
            })?;
        Ok(())
    }
}
