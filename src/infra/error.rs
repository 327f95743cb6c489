//! Types for reporting errors that happened during a request.
//!
//! Every error leaves the service as an [`ErrorBody`], so clients only
//! have to understand one shape.

use super::extract::Json;
use crate::feature::item::item_service::ItemError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::HeaderValue,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::ResponseForPanic;
use utoipa::ToSchema;

/// A machine readable classification of an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The request was malformed or failed validation.
    BadRequest,
    /// The referenced resource does not exist.
    NotFound,
    /// The request conflicts with existing data.
    Conflict,
    /// The request body was not JSON.
    UnsupportedMediaType,
    /// The request took too long.
    RequestTimeout,
    /// Something went wrong on our side.
    InternalError,
}

/// A standard error response body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    success: bool,
    /// What kind of error this is.
    kind: ErrorKind,
    /// A description of the error.
    message: String,
    /// When the error happened.
    timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub(crate) fn new(kind: ErrorKind, message: String) -> Self {
        Self {
            success: false,
            kind,
            message,
            timestamp: Utc::now(),
        }
    }

    /// The error classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error message.
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }
}

/// An error from our API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An error caused by the client.
    #[error("{0}")]
    ClientError(#[from] ClientError),
    /// An internal error.
    #[error("{0}")]
    InternalError(#[from] InternalError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::ClientError(e) => e.into_response(),
            ApiError::InternalError(e) => {
                tracing::error!("internal error: {}", e);
                e.into_response()
            }
        }
    }
}

/// The result of calling API-related functions.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<ItemError> for ApiError {
    fn from(e: ItemError) -> Self {
        match e {
            ItemError::InvalidData(_) => ClientError::BadRequest(e.to_string()).into(),
            ItemError::DuplicateCode(_) => ClientError::Conflict(e.to_string()).into(),
            ItemError::NotFound(_) => ClientError::NotFound(e.to_string()).into(),
            ItemError::Storage { .. } => InternalError::Item(e).into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ClientError::from(e).into()
    }
}

/// Errors caused by the client.
/// The client can do something to fix these.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Input validation failed, or some illegal operation was attempted.
    #[error("{0}")]
    BadRequest(String),
    /// Unsupported media type.
    #[error("{0}")]
    UnsupportedMediaType(String),
    /// The resource was not found.
    #[error("{0}")]
    NotFound(String),
    /// The resource already exists.
    #[error("{0}")]
    Conflict(String),
    /// The request did not finish in time.
    #[error("request timed out")]
    RequestTimeout,
}

impl Default for ClientError {
    fn default() -> Self {
        Self::BadRequest("bad request".to_string())
    }
}

impl From<JsonRejection> for ClientError {
    fn from(value: JsonRejection) -> Self {
        match value {
            JsonRejection::MissingJsonContentType(e) => {
                ClientError::UnsupportedMediaType(e.body_text())
            }
            e => ClientError::BadRequest(e.body_text()),
        }
    }
}

impl From<QueryRejection> for ClientError {
    fn from(value: QueryRejection) -> Self {
        ClientError::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ClientError {
    fn from(value: PathRejection) -> Self {
        ClientError::BadRequest(format!("invalid path: {}", value.body_text()))
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = e
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let codes: Vec<&str> = errors.iter().map(|e| e.code.as_ref()).collect();
                format!("{field} ({})", codes.join(","))
            })
            .collect();
        fields.sort();
        ClientError::BadRequest(format!("invalid field(s): {}", fields.join(", ")))
    }
}

impl ClientError {
    fn status_and_kind(&self) -> (StatusCode, ErrorKind) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorKind::BadRequest),
            Self::UnsupportedMediaType(_) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ErrorKind::UnsupportedMediaType,
            ),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            Self::Conflict(_) => (StatusCode::CONFLICT, ErrorKind::Conflict),
            Self::RequestTimeout => (StatusCode::REQUEST_TIMEOUT, ErrorKind::RequestTimeout),
        }
    }
}

impl IntoResponse for ClientError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = self.status_and_kind();
        (status, Json(ErrorBody::new(kind, self.to_string()))).into_response()
    }
}

/// An internal error.
/// The client cannot do anything about this.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    /// The item service failed for reasons outside the client's control.
    #[error("{0}")]
    Item(ItemError),
    /// Other miscellaneous errors.
    #[error("{0}")]
    Other(String),
}

impl IntoResponse for InternalError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody::new(ErrorKind::InternalError, "internal error".to_string());
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        response
            .headers_mut()
            .insert("Retry-After", HeaderValue::from_static("5"));
        response
    }
}

/// A handler for converting panics into proper responses for the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanicHandler;

impl ResponseForPanic for PanicHandler {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(
        &mut self,
        _: Box<dyn std::any::Any + Send + 'static>,
    ) -> http::Response<Self::ResponseBody> {
        ApiError::InternalError(InternalError::Other("panic".to_string())).into_response()
    }
}
