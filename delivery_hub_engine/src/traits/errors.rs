use thiserror::Error;

use crate::db_types::{OrderId, OrderStatus, PlatformCode};

/// Errors surfaced by the storage backend. [`IntegrationError::InvalidStateTransition`] is deliberately a
/// distinct variant (not folded into a validation error) so callers can answer "the order already moved on"
/// with a conflict rather than a bad-request.
#[derive(Debug, Clone, Error)]
pub enum IntegrationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Platform {0} is not configured")]
    PlatformNotFound(String),
    #[error("Order {external_id} on {platform} was not found")]
    OrderNotFound { platform: PlatformCode, external_id: OrderId },
    #[error("Illegal status transition from {from} to {to}")]
    InvalidStateTransition { from: OrderStatus, to: OrderStatus },
    #[error("Webhook job {0} was not found")]
    JobNotFound(String),
    #[error("Malformed record in database: {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for IntegrationError {
    fn from(e: sqlx::Error) -> Self {
        IntegrationError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for IntegrationError {
    fn from(e: serde_json::Error) -> Self {
        IntegrationError::CorruptRecord(e.to_string())
    }
}
