use crate::application::CommandError;
use crate::presentation::rest::dto::ErrorResponse;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// API error type
///
/// Rendered as `{status: "error", code, message}` where `code` repeats the
/// HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status: StatusCode,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
            status: StatusCode::NOT_FOUND,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn strategy_not_found(id: u64) -> Self {
        Self::not_found(format!("Strategy not found: {}", id))
    }

    pub fn invalid_parameter(param: &str, reason: &str) -> Self {
        Self::bad_request(format!("Illegal parameter '{}': {}", param, reason))
    }
}

impl From<CommandError> for ApiError {
    fn from(error: CommandError) -> Self {
        match &error {
            CommandError::NotFound { .. } => Self::not_found(error.to_string()),
            CommandError::InvalidCommand(_) => Self::bad_request(error.to_string()),
            CommandError::InternalFailure(_) => {
                tracing::error!("Command failed: {}", error);
                Self::internal(error.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.status.as_u16(), self.message));
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_errors_map_to_status() {
        let not_found: ApiError = CommandError::NotFound {
            entity: "Order",
            id: "ORD-X".to_string(),
        }
        .into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.message, "Order not found: ORD-X");

        let invalid: ApiError = CommandError::InvalidCommand("nope".to_string()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let internal: ApiError = CommandError::InternalFailure("boom".to_string()).into();
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
