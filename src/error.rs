use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::pagination::Pagination;

/// Uniform body for every response: `{success, message?, data?}`.
/// List endpoints add `pagination` next to `data`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            pagination: None,
        })
    }

    pub fn page(message: impl Into<String>, data: T, pagination: Pagination) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            pagination: Some(pagination),
        })
    }
}

impl ApiResponse<()> {
    pub fn done(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: insufficient privileges")]
    Forbidden,
    #[error("{provider} request failed: {message}")]
    Upstream {
        provider: &'static str,
        message: String,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Upstream { .. } | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Maps a unique-constraint violation to 409, anything else to 500.
    pub fn from_db(err: anyhow::Error, conflict: &str) -> Self {
        let unique = err
            .chain()
            .filter_map(|e| e.downcast_ref::<sqlx::Error>())
            .any(|e| matches!(e, sqlx::Error::Database(db) if db.is_unique_violation()));
        if unique {
            ApiError::Conflict(conflict.to_string())
        } else {
            ApiError::Internal(err)
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = ?e, "unhandled error");
                "Internal Server Error".to_string()
            }
            ApiError::Upstream { provider, message } => {
                error!(%provider, %message, "upstream failure");
                self.to_string()
            }
            other => {
                warn!(%status, message = %other, "request rejected");
                other.to_string()
            }
        };
        let body = ApiResponse::<()> {
            success: false,
            message: Some(message),
            data: None,
            pagination: None,
        };
        (status, Json(body)).into_response()
    }
}
