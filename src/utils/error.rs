use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    InvalidInput(String),
    Conflict(String),
    /// Storage or infrastructure fault. The message is logged, never returned to the caller.
    Internal(String),
}

impl AppError {
    pub fn unauthenticated() -> Self {
        AppError::Unauthenticated("You must be logged in to perform this action".to_string())
    }

    pub fn admin_only() -> Self {
        AppError::Forbidden("This action is reserved for administrators".to_string())
    }

    pub fn not_owner() -> Self {
        AppError::Forbidden("Not authorized".to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(e: mongodb::error::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidInput(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Internal(msg) => {
                log::error!("❌ Internal failure: {}", msg);
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": message
        }))
    }
}
