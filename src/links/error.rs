use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Short code already exists")]
    DuplicateCode,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid short code: {0}")]
    InvalidCode(String),

    #[error("Link not found")]
    NotFound,

    #[error("Link belongs to another user")]
    Forbidden,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid pagination cursor")]
    InvalidCursor,

    #[error("Failed to generate a unique short code after {0} attempts")]
    CodeSpaceExhausted(usize),

    #[error("{message}")]
    InvalidRequest { status: StatusCode, message: String },

    #[error(transparent)]
    Storage(anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl LinkError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LinkError::DuplicateCode => StatusCode::CONFLICT,
            LinkError::InvalidUrl(_) | LinkError::InvalidCode(_) | LinkError::InvalidCursor => {
                StatusCode::BAD_REQUEST
            }
            LinkError::NotFound => StatusCode::NOT_FOUND,
            LinkError::Forbidden => StatusCode::FORBIDDEN,
            LinkError::Unauthenticated => StatusCode::UNAUTHORIZED,
            LinkError::CodeSpaceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            LinkError::InvalidRequest { status, .. } => *status,
            LinkError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for LinkError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => LinkError::DuplicateCode,
            StorageError::NotFound => LinkError::NotFound,
            StorageError::Forbidden => LinkError::Forbidden,
            StorageError::Other(e) => LinkError::Storage(e),
        }
    }
}

// Extractor rejections keep axum's status and message but use the JSON error body
macro_rules! impl_from_rejection {
    ($($rejection:ty),*) => {
        $(impl From<$rejection> for LinkError {
            fn from(rejection: $rejection) -> Self {
                LinkError::InvalidRequest {
                    status: rejection.status(),
                    message: rejection.body_text(),
                }
            }
        })*
    };
}

impl_from_rejection!(JsonRejection, QueryRejection, PathRejection);

impl From<anyhow::Error> for LinkError {
    fn from(err: anyhow::Error) -> Self {
        LinkError::Storage(err)
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            LinkError::Storage(e) => {
                tracing::error!(error = ?e, "storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse { error: message });
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
