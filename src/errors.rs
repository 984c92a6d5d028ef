use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Body returned for every rejected receipt submission.
pub const INVALID_RECEIPT_MESSAGE: &str = "The receipt is invalid";

/// Body returned for every failed points lookup.
pub const RECEIPT_NOT_FOUND_MESSAGE: &str = "No receipt found for that id";

/// Validation failures raised while scoring a receipt.
///
/// Each variant keeps the raw input so the rejection can be logged with the
/// offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptError {
    /// A currency amount contained something other than digits, commas and a decimal point.
    InvalidCharacter { value: String },
    /// A currency amount was not of the form `digits.dd`.
    InvalidPrecision { value: String },
    /// The purchase date is not a real `YYYY-MM-DD` date.
    InvalidDate { value: String, reason: String },
    /// The purchase date lies after the evaluation time.
    FutureDate { value: String },
    /// The purchase date and time do not form a valid `YYYY-MM-DD HH:MM` instant.
    InvalidTime { value: String, reason: String },
    /// The purchase instant lies after the evaluation time.
    FutureTime { value: String },
}

impl ReceiptError {
    /// Name of the receipt field the error originated from.
    ///
    /// Amount errors only abort scoring when they come from the total; item
    /// prices that fail to parse are skipped instead.
    pub fn field(&self) -> &'static str {
        match self {
            ReceiptError::InvalidCharacter { .. } | ReceiptError::InvalidPrecision { .. } => {
                "total"
            }
            ReceiptError::InvalidDate { .. } | ReceiptError::FutureDate { .. } => "purchaseDate",
            ReceiptError::InvalidTime { .. } | ReceiptError::FutureTime { .. } => "purchaseTime",
        }
    }
}

impl fmt::Display for ReceiptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptError::InvalidCharacter { value } => {
                write!(f, "Invalid character in amount '{}'", value)
            }
            ReceiptError::InvalidPrecision { value } => {
                write!(f, "Amount '{}' must have exactly two decimal places", value)
            }
            ReceiptError::InvalidDate { value, reason } => {
                write!(f, "Invalid purchase date '{}': {}", value, reason)
            }
            ReceiptError::FutureDate { value } => {
                write!(f, "Purchase date '{}' is in the future", value)
            }
            ReceiptError::InvalidTime { value, reason } => {
                write!(f, "Invalid purchase time '{}': {}", value, reason)
            }
            ReceiptError::FutureTime { value } => {
                write!(f, "Purchase time '{}' is in the future", value)
            }
        }
    }
}

impl std::error::Error for ReceiptError {}

/// Failure reported by a key-value backend for a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The attempt did not complete within its time bound.
    DeadlineExceeded,
    /// Any other backend fault (connection refused, protocol error, ...).
    Failed(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::DeadlineExceeded => write!(f, "deadline exceeded"),
            BackendError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Outcome of a store operation once the retry policy has run its course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key was never written or has expired.
    NotFound { key: String },
    /// Every attempt hit its deadline, or the caller's deadline passed.
    Unavailable { attempts: u32 },
    /// The backend failed with a non-timeout error. Not retried.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { key } => write!(f, "Key does not exist in store: {}", key),
            StoreError::Unavailable { attempts } => write!(
                f,
                "Store unavailable: deadline exceeded after {} attempt(s)",
                attempts
            ),
            StoreError::Backend(msg) => write!(f, "Store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// The submitted receipt could not be decoded, validated or stored.
    InvalidReceipt(String),
    /// No points could be returned for the requested id.
    ReceiptNotFound(String),
    /// The request did not finish within the configured request timeout.
    RequestTimeout,
    /// A dependency (the store) is not answering.
    ServiceUnavailable(String),
    /// Internal server error.
    InternalError(String),
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidReceipt(msg) => write!(f, "Invalid receipt: {}", msg),
            AppError::ReceiptNotFound(msg) => write!(f, "Receipt not found: {}", msg),
            AppError::RequestTimeout => write!(f, "Request timed out"),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// The detail carried by each variant is logged; clients only ever see the
    /// fixed message for the route.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::InvalidReceipt(msg) => {
                tracing::info!("Rejected receipt: {}", msg);
                (StatusCode::BAD_REQUEST, INVALID_RECEIPT_MESSAGE.to_string())
            }
            AppError::ReceiptNotFound(msg) => {
                tracing::info!("Points lookup failed: {}", msg);
                (StatusCode::NOT_FOUND, RECEIPT_NOT_FOUND_MESSAGE.to_string())
            }
            AppError::RequestTimeout => {
                tracing::warn!("Request exceeded its timeout");
                (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service unavailable".to_string(),
                )
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<ReceiptError> for AppError {
    fn from(err: ReceiptError) -> Self {
        AppError::InvalidReceipt(format!("{} ({})", err, err.field()))
    }
}
