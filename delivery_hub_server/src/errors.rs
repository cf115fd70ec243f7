use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use delivery_hub_engine::IntegrationError;
use marketplace_tools::{AdapterError, RegistryError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Configuration error. {0}")]
    ConfigurationError(String),
    #[error("Backend storage error. {0}")]
    BackendError(String),
    #[error("Authentication error. {0}")]
    AuthenticationError(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("Unsupported platform. {0}")]
    UnsupportedPlatform(String),
    #[error("Not found. {0}")]
    NotFound(String),
    #[error("Illegal order state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
    #[error("IO error. {0}")]
    IOError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::ValidationError(_) | Self::UnsupportedPlatform(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            Self::InitializeError(_)
            | Self::ConfigurationError(_)
            | Self::BackendError(_)
            | Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({"error": self.to_string()}))
    }
}

impl From<IntegrationError> for ServerError {
    fn from(e: IntegrationError) -> Self {
        match e {
            IntegrationError::InvalidStateTransition { from, to } => Self::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            IntegrationError::PlatformNotFound(code) => {
                Self::NotFound(format!("Platform {code} is not configured"))
            },
            IntegrationError::OrderNotFound { platform, external_id } => {
                Self::NotFound(format!("Order {external_id} on {platform} does not exist"))
            },
            e => Self::BackendError(e.to_string()),
        }
    }
}

impl From<RegistryError> for ServerError {
    fn from(e: RegistryError) -> Self {
        match e {
            // Registry resolution happens on the webhook path. A code without a provisioned platform row
            // makes the request unroutable, which is the caller's problem: 400, not 404.
            RegistryError::PlatformNotFound(code) => {
                Self::UnsupportedPlatform(format!("Platform {code} is not provisioned"))
            },
            RegistryError::NoAdapterImplemented(code) => {
                Self::UnsupportedPlatform(format!("No adapter is implemented for {code}"))
            },
            RegistryError::AdapterInit(code, reason) => {
                Self::ConfigurationError(format!("Adapter for {code} failed to initialize. {reason}"))
            },
            RegistryError::Backend(e) => Self::from(e),
        }
    }
}

impl From<AdapterError> for ServerError {
    fn from(e: AdapterError) -> Self {
        Self::BackendError(e.to_string())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e.to_string())
    }
}
