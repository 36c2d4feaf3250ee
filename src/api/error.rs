use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::borrow::Cow;

use crate::modules::upload::category::UploadCategory;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("Internal Server Error")]
    InternalServer,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub message: Cow<'static, str>,
}

impl Error {
    pub fn bad_request(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upload(err) => err.status_code(),
            Error::InternalServer => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut res = HttpResponse::build(self.status_code());

        match self {
            Error::NotFound(msg) | Error::BadRequest(msg) => {
                res.json(ErrorBody { message: msg.clone() })
            }
            Error::Upload(err) => err.error_response(),
            Error::InternalServer => {
                res.json(ErrorBody { message: "Internal Server Error".into() })
            }
        }
    }
}

/// Failures raised while parsing and storing a multipart upload.
///
/// The set is closed: the translator matches it exhaustively and every variant
/// renders as a 400 with a stable machine code.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum UploadError {
    #[error("File size exceeds the maximum limit of {max_size}")]
    FileTooLarge { field: String, max_size: String },
    #[error("Too many files. Maximum is {max} files")]
    TooManyFiles { field: String, max: usize },
    #[error("Unexpected file field: {field}")]
    UnexpectedField { field: String },
    #[error("Invalid file type for {category} upload. Allowed types: {}", .allowed.join(", "))]
    InvalidFileType {
        field: String,
        category: UploadCategory,
        mime_type: String,
        allowed: &'static [&'static str],
    },
    #[error("{message}")]
    Other { field: Option<String>, message: String },
}

#[derive(Debug, Serialize)]
pub struct UploadErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(rename = "maxSize", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<String>,
}

impl UploadError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other { field: None, message: message.into() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            UploadError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            UploadError::TooManyFiles { .. } => "TOO_MANY_FILES",
            UploadError::UnexpectedField { .. } => "UNEXPECTED_FIELD",
            UploadError::InvalidFileType { .. } => "INVALID_FILE_TYPE",
            UploadError::Other { .. } => "UPLOAD_ERROR",
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            UploadError::FileTooLarge { field, .. }
            | UploadError::TooManyFiles { field, .. }
            | UploadError::UnexpectedField { field }
            | UploadError::InvalidFileType { field, .. } => Some(field),
            UploadError::Other { field, .. } => field.as_deref(),
        }
    }

    pub fn body(&self) -> UploadErrorBody {
        let max_size = match self {
            UploadError::FileTooLarge { max_size, .. } => Some(max_size.clone()),
            _ => None,
        };
        UploadErrorBody { error: self.code(), message: self.to_string(), max_size }
    }
}

impl ResponseError for UploadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(Cow<'static, str>),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::Upload(err) => Error::Upload(err),
            _ => {
                tracing::error!("Internal Server Error: {:?}", value);
                Error::InternalServer
            }
        }
    }
}

impl SystemError {
    pub fn invalid_config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
