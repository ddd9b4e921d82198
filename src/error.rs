//! Error handler for onboard.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Message returned when registration hits an already used email.
pub const DUPLICATE_EMAIL_MESSAGE: &str =
    "User with that email already exists";

const SERVER_ERROR_BODY: &str = "Server error";

/// Validation failures are reported in this field order, whatever order the
/// checks ran in.
const FIELD_ORDER: [&str; 3] = ["name", "email", "password"];

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error("account already exists")]
    Conflict,

    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("system clock is before unix epoch")]
    Clock(#[from] std::time::SystemTimeError),

    #[error("internal server error: {details}")]
    Internal { details: String },
}

/// One entry of the `errors` array on 400 responses.
#[derive(Debug, Serialize)]
pub struct FieldError {
    msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl FieldError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            field: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorList {
    errors: Vec<FieldError>,
}

/// Flatten validation failures into one entry per failed check.
fn ordered_field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let fields = errors.field_errors();
    let mut report = Vec::new();

    for field in FIELD_ORDER {
        if let Some(issues) = fields.get(field) {
            report.extend(issues.iter().map(|issue| FieldError {
                msg: issue.to_string(),
                field: Some(field.to_owned()),
            }));
        }
    }

    report
}

fn bad_request(errors: Vec<FieldError>) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorList { errors })).into_response()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => {
                bad_request(ordered_field_errors(&errors))
            },
            Self::Json(rejection) => {
                bad_request(vec![FieldError::new(rejection.body_text())])
            },
            Self::Conflict => {
                bad_request(vec![FieldError::new(DUPLICATE_EMAIL_MESSAGE)])
            },
            err => {
                // Dependency failures stay opaque to the caller.
                tracing::error!(error = %err, "request failed on a dependency");
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY)
                    .into_response()
            },
        }
    }
}
