//! `ValidatedJson<T>` — a `Json<T>` replacement that sanitizes and
//! validates request bodies before the handler runs.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// A field-level validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ValidationErrorResponse {
    error: String,
    message: String,
    errors: Vec<FieldError>,
    code: u16,
    timestamp: String,
    correlation_id: String,
}

/// Validation failure that renders as an HTTP 400 with per-field details
#[derive(Debug)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }
}

impl axum::response::IntoResponse for ValidationError {
    fn into_response(self) -> axum::response::Response {
        let message = if self.errors.len() == 1 {
            format!("Validation failed for field '{}'", self.errors[0].field)
        } else {
            format!("Validation failed for {} fields", self.errors.len())
        };
        let body = ValidationErrorResponse {
            error: "ValidationError".to_string(),
            message,
            errors: self.errors,
            code: 400,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: Uuid::new_v4().to_string(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Request types opt in to `ValidatedJson` by implementing this
pub trait Validatable: Sized {
    /// Normalize fields in place (trim, lowercase addresses, ...)
    fn sanitize(&mut self);

    /// Check fields against the operation's rules
    fn validate(&self) -> Result<(), Vec<FieldError>>;
}

pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validatable + Send,
    S: Send + Sync,
{
    type Rejection = ValidationError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|err| ValidationError::single("body", err.body_text()))?;

        data.sanitize();
        data.validate().map_err(ValidationError::new)?;

        Ok(ValidatedJson(data))
    }
}

/// Accumulates field errors across a request's checks
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<FieldError>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check<F>(&mut self, field: &str, validator: F) -> &mut Self
    where
        F: FnOnce() -> Result<(), String>,
    {
        if let Err(message) = validator() {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn build(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_failures_only() {
        let mut builder = ValidationBuilder::new();
        builder
            .check("address", || Err("is required".to_string()))
            .check("label", || Ok(()))
            .add_error("apy", "must be positive");

        let errors = builder.build().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "address");
        assert_eq!(errors[1].field, "apy");
    }

    #[test]
    fn empty_builder_passes() {
        assert!(ValidationBuilder::new().build().is_ok());
    }
}
