//! # Error handling for view set routes
//!
//! Every handler in this crate, synthesized or explicitly authored, returns
//! `Result<_, ApiError>`. The error maps to an HTTP status code and a sanitized
//! JSON body; database and internal details are logged through `tracing` and
//! never sent to the client.
//!
//! ```rust,ignore
//! use viewcrate::ApiError;
//!
//! async fn handler(State(db): State<DatabaseConnection>) -> Result<Json<Value>, ApiError> {
//!     let company = company::Entity::find_by_id(1)
//!         .one(&db)
//!         .await?
//!         .ok_or_else(|| ApiError::not_found("Company", Some("1".to_string())))?;
//!     Ok(Json(serde_json::to_value(company)?))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::validation::ValidationErrors;

/// API error type with logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found
    NotFound {
        /// Resource type (e.g. "Company")
        resource: String,
        /// Optional key that was not found
        id: Option<String>,
    },

    /// 400 Bad Request, a business rule rejected the input
    BadRequest { message: String },

    /// 409 Conflict, usually a unique constraint
    Conflict { message: String },

    /// 422 Unprocessable Entity, the body did not satisfy its input schema
    ValidationFailed { errors: Vec<String> },

    /// 500, details logged only
    Database { message: String, internal: DbErr },

    /// 500, details logged only
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    /// Wrap a database error; the error itself is only logged.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message the client sees
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => match errors.as_slice() {
                [single] => single.clone(),
                _ => format!("Validation failed: {}", errors.join(", ")),
            },
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error body sent to clients
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Per-field validation messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// - `RecordNotFound` becomes 404
/// - unique constraint violations become 409
/// - foreign key violations become 422, the record references missing data
/// - everything else is a logged 500
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(msg) = &err {
            let resource = msg.split_whitespace().next().unwrap_or("Resource");
            return Self::not_found(resource, None);
        }
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Self::conflict("A record with these values already exists")
            }
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => Self::validation_failed(vec![
                "The record references data that does not exist".to_string(),
            ]),
            _ => Self::database(err),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_failed(errors.iter().map(ToString::to_string).collect())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal("Failed to serialize data", Some(err.to_string()))
    }
}
