use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// AppError
///
/// The single failure type shared by the repository, the authentication service,
/// the seed loader and the handlers. The HTTP boundary converts each variant into a
/// status code in one place (`IntoResponse`), so services never deal with statuses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Required input is missing or out of range.
    #[error("{0}")]
    Validation(String),
    /// The record already exists (duplicate account email).
    #[error("{0}")]
    Conflict(String),
    /// Unknown id, or no record matched.
    #[error("{0}")]
    NotFound(String),
    /// The credentials did not match the stored hash.
    #[error("invalid email or password")]
    Auth,
    /// Logged in, but the role does not allow the operation.
    #[error("access denied: admins only")]
    Forbidden,
    /// The remote seed document could not be fetched or decoded.
    #[error("failed to fetch seed data from {url}: {reason}")]
    UpstreamFetch { url: String, reason: String },
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::UpstreamFetch { .. } => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("record already exists".to_string())
            }
            _ => AppError::Storage(err.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hashing failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {}", err))
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError::Storage(format!("session store: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-side failures are logged in full but reported generically.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
