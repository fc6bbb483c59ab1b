use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::ingest::IngestionError;
use crate::service::employee::EmployeeError;
use crate::store::StoreError;
use crate::validation::employee::FieldErrorBody;

const INTERNAL: &str = "Internal server error";

/// Body of every failed request.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = false)]
    pub success: bool,
    #[schema(example = "Line 3: invalid date \"2023-10-15\", expected yyyy/MM/dd")]
    pub error: String,
    /// Per-field failures, present only for employee validation errors.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorBody>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: Vec::new(),
        }
    }
}

impl ResponseError for IngestionError {
    fn status_code(&self) -> StatusCode {
        match self {
            IngestionError::MissingFile
            | IngestionError::InvalidFilename(_)
            | IngestionError::Line(_)
            | IngestionError::Decode { .. } => StatusCode::BAD_REQUEST,
            IngestionError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IngestionError::Read(_) | IngestionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            INTERNAL.to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(ErrorBody::new(message))
    }
}

impl ResponseError for EmployeeError {
    fn status_code(&self) -> StatusCode {
        match self {
            EmployeeError::Validation(_) => StatusCode::BAD_REQUEST,
            EmployeeError::NotFound(_) => StatusCode::NOT_FOUND,
            EmployeeError::AlreadyExists(_) => StatusCode::CONFLICT,
            EmployeeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            EmployeeError::Validation(errors) => {
                warn!(errors = %errors, "Employee payload rejected");
                ErrorBody {
                    errors: errors.0.iter().map(FieldErrorBody::from).collect(),
                    ..ErrorBody::new(self.to_string())
                }
            }
            EmployeeError::Store(cause) => {
                error!(error = %cause, "Employee store failed");
                ErrorBody::new(INTERNAL)
            }
            other => ErrorBody::new(other.to_string()),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Read-side failures shared by the attendance endpoints.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid {field} {value:?}, expected yyyy/MM/dd")]
    InvalidDate { field: &'static str, value: String },

    #[error("Failed to read attendance records")]
    Store(#[from] StoreError),
}

impl ResponseError for QueryError {
    fn status_code(&self) -> StatusCode {
        match self {
            QueryError::InvalidDate { .. } => StatusCode::BAD_REQUEST,
            QueryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let QueryError::Store(cause) = self {
            error!(error = %cause, "Attendance read failed");
        }
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

/// Keeps malformed JSON bodies in the common error shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorBody::new(format!("Invalid JSON body: {err}")));
    InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorBody::new(format!("Invalid query string: {err}")));
    InternalError::from_response(err, response).into()
}
