//! HTTP mapping of store errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use notevault_common::{Error, ErrorKind};

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub kind: ErrorKind,
}

/// Store error on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code for an error kind.
    pub fn status_for(kind: ErrorKind) -> StatusCode {
        match kind {
            ErrorKind::InvalidPath
            | ErrorKind::InvalidRequest
            | ErrorKind::IsDirectory
            | ErrorKind::CrossDevice => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = Self::status_for(kind);

        if kind.is_client_error() {
            debug!(%kind, detail = self.0.detail(), "Request rejected");
        } else {
            error!(%kind, detail = self.0.detail(), "Request failed");
        }

        let body = ErrorResponse {
            detail: self.0.detail().to_string(),
            kind,
        };
        (status, Json(body)).into_response()
    }
}
