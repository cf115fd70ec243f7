use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Webhook payload is malformed: {0}")]
    MalformedPayload(String),
    #[error("Could not obtain an access token: {0}")]
    TokenError(String),
    #[error("No credentials configured for {0}; outbound calls are disabled")]
    MissingCredentials(String),
}
