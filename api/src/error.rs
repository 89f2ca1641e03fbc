use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Machine-readable error vocabulary of the dashboard API.
///
/// The wire `error` field carries the variant name and the HTTP status is
/// derived from it, so a handler cannot pair a code with the wrong status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UnknownUser,
    UnknownToken,
    InvalidAmount,
    InvalidApy,
    UserNotFound,
    WalletNotFound,
    TokenNotFound,
    PositionNotFound,
    NotFound,
    UserExists,
    WalletExists,
    InternalServerError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::UnknownUser
            | ErrorCode::UnknownToken
            | ErrorCode::InvalidAmount
            | ErrorCode::InvalidApy => StatusCode::BAD_REQUEST,
            ErrorCode::UserNotFound
            | ErrorCode::WalletNotFound
            | ErrorCode::TokenNotFound
            | ErrorCode::PositionNotFound
            | ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::UserExists | ErrorCode::WalletExists => StatusCode::CONFLICT,
            ErrorCode::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnknownUser => "UnknownUser",
            ErrorCode::UnknownToken => "UnknownToken",
            ErrorCode::InvalidAmount => "InvalidAmount",
            ErrorCode::InvalidApy => "InvalidApy",
            ErrorCode::UserNotFound => "UserNotFound",
            ErrorCode::WalletNotFound => "WalletNotFound",
            ErrorCode::TokenNotFound => "TokenNotFound",
            ErrorCode::PositionNotFound => "PositionNotFound",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::UserExists => "UserExists",
            ErrorCode::WalletExists => "WalletExists",
            ErrorCode::InternalServerError => "InternalServerError",
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    code: u16,
    timestamp: String,
    correlation_id: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_not_found(id: Uuid) -> Self {
        Self::new(ErrorCode::UserNotFound, format!("User {} not found", id))
    }

    pub fn wallet_not_found(id: Uuid) -> Self {
        Self::new(ErrorCode::WalletNotFound, format!("Wallet {} not found", id))
    }

    pub fn token_not_found(symbol: &str) -> Self {
        Self::new(
            ErrorCode::TokenNotFound,
            format!("Token {} not found", symbol),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        let status = self.code.status();
        let payload = ErrorResponse {
            error: self.code.as_str().to_string(),
            message: self.message,
            code: status.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: correlation_id.clone(),
        };

        let mut response = (status, Json(payload)).into_response();
        if let Ok(value) = HeaderValue::from_str(&correlation_id) {
            response
                .headers_mut()
                .insert(header::HeaderName::from_static("x-correlation-id"), value);
        }
        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_the_error_code() {
        assert_eq!(ErrorCode::UnknownToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::WalletNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::WalletExists.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::InternalServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_carries_status_and_correlation_header() {
        let id = Uuid::new_v4();
        let response = ApiError::wallet_not_found(id).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-correlation-id"));
    }
}
