use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::infra::{error::InfraError, store::StoreError};

/// Diagnostic payload attached to error responses as an extension, for the
/// logging middleware to pick up. Never serialized to clients.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("resource not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound | AppError::Store(StoreError::NotFound))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(StoreError::NotFound) | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::Invalid { .. }) | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Store(StoreError::Corrupt { .. })
            | AppError::Store(StoreError::Backend(_))
            | AppError::Infra(_)
            | AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing label. Backend details stay in the [`ErrorReport`].
    fn presentation_message(&self) -> String {
        match self {
            AppError::Store(StoreError::NotFound) | AppError::NotFound => {
                "Resource not found".to_string()
            }
            AppError::Store(StoreError::Invalid { message }) => message.clone(),
            AppError::Validation(message) => message.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Store(StoreError::Corrupt { .. }) => "Stored content is corrupt".to_string(),
            AppError::Store(StoreError::Backend(_)) | AppError::Infra(_) => {
                "Storage backend failure".to_string()
            }
            AppError::Unexpected(_) => "Unexpected error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.presentation_message();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, Json(json!({ "error": message }))).into_response();
        report.attach(&mut response);
        response
    }
}
