use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{error::DbErr, SqlErr, TransactionError};
use serde_json::json;
use tracing::error;
use validator::ValidationErrors;

use crate::jsonapi::{
    document::{ErrorDocument, ErrorObject, ErrorSource, JsonApiObject},
    MEDIA_TYPE,
};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation error: {0}")]
    InvalidAttributes(ValidationErrors),

    #[error("Attribute '{0}' is read-only")]
    ReadOnlyAttribute(String),

    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid query parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::ForeignKeyConstraintViolation(_)) = err.sql_err() {
            return ServiceError::ReferentialIntegrity("item must exist".to_string());
        }
        match err {
            DbErr::RecordNotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::DatabaseError(other),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidAttributes(err)
    }
}

impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db) => db.into(),
            TransactionError::Transaction(service) => service,
        }
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidAttributes(_)
            | Self::ReadOnlyAttribute(_)
            | Self::ReferentialIntegrity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the error object
    pub fn code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) | Self::InvalidAttributes(_) => "validation_error",
            Self::ReadOnlyAttribute(_) => "read_only_attribute",
            Self::ReferentialIntegrity(_) => "referential_integrity_error",
            Self::Conflict(_) => "conflict",
            Self::Forbidden(_) => "forbidden",
            Self::BadRequest(_) => "bad_request",
            Self::InvalidParameter { .. } => "invalid_query_parameter",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::NotAcceptable(_) => "not_acceptable",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) => "Internal server error".to_string(),
            Self::NotFound(msg)
            | Self::ValidationError(msg)
            | Self::ReferentialIntegrity(msg)
            | Self::Conflict(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::PayloadTooLarge(msg)
            | Self::UnsupportedMediaType(msg)
            | Self::NotAcceptable(msg) => msg.clone(),
            Self::InvalidParameter { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }

    /// JSON:API error objects describing this error, one per offending member
    pub fn error_objects(&self) -> Vec<ErrorObject> {
        let status = self.status_code();
        let object = |detail: String, source: Option<ErrorSource>| ErrorObject {
            status: status.as_u16().to_string(),
            code: self.code().to_string(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            detail,
            source,
            meta: None,
        };

        match self {
            Self::InvalidAttributes(errors) => {
                let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
                fields.sort_by_key(|(field, _)| *field);

                fields
                    .into_iter()
                    .flat_map(|(field, field_errors)| {
                        field_errors.iter().map(move |err| {
                            let message = match err.code.as_ref() {
                                "required" => "can't be blank".to_string(),
                                _ => err
                                    .message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| "is invalid".to_string()),
                            };
                            (field, message)
                        })
                    })
                    .map(|(field, message)| {
                        object(
                            format!("{} {}", field, message),
                            Some(ErrorSource::pointer(format!("/data/attributes/{}", field))),
                        )
                    })
                    .collect()
            }
            Self::ReadOnlyAttribute(name) => vec![object(
                self.to_string(),
                Some(ErrorSource::pointer(format!("/data/attributes/{}", name))),
            )],
            Self::ReferentialIntegrity(msg) => vec![object(
                msg.clone(),
                Some(ErrorSource::pointer("/data/relationships/item")),
            )],
            Self::InvalidParameter { parameter, message } => vec![object(
                message.clone(),
                Some(ErrorSource::parameter(parameter.clone())),
            )],
            _ => vec![object(self.response_message(), None)],
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let meta = json!({
            "request_id": current_request_id(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let errors = self
            .error_objects()
            .into_iter()
            .map(|mut object| {
                object.meta = Some(meta.clone());
                object
            })
            .collect();

        let body = ErrorDocument {
            errors,
            jsonapi: JsonApiObject::default(),
        };

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        response
    }
}
