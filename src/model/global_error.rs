use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 400 BAD REQUEST
    ValidationError,
    MissingStatusId,
    MissingDepartmentId,
    MissingUserId,
    InvalidAttachment,
    DuplicateAccount,
    InvalidCredentials,
    NotRefreshToken,
    InvalidRefreshToken,

    // 401 UNAUTHORIZED
    AuthenticationFailed,
    InvalidAuthToken,

    // 404 NOT FOUND
    TicketNotFound,
    PostNotFound,
    StatusNotFound,
    DepartmentNotFound,
    TicketTypeNotFound,
    MemberNotFound,

    // 500 SERVER ERRORS
    OpenStatusMissing,
    DatabaseError,
    FileStorageError,
    InternalError,
    TokenGenerationFailed,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Validation failed",
            ErrorCode::MissingStatusId => "Status ID is required",
            ErrorCode::MissingDepartmentId => "Department ID is required",
            ErrorCode::MissingUserId => "User ID is required",
            ErrorCode::InvalidAttachment => "Attachment rejected",
            ErrorCode::DuplicateAccount => "A user with that username or email already exists",
            ErrorCode::InvalidCredentials => "Username OR password does not exist",
            ErrorCode::NotRefreshToken => "Not a refresh token",
            ErrorCode::InvalidRefreshToken => "Refresh token is invalid or expired",

            ErrorCode::AuthenticationFailed => "Authentication credentials were not provided",
            ErrorCode::InvalidAuthToken => "Invalid or expired token",

            ErrorCode::TicketNotFound => "Ticket not found",
            ErrorCode::PostNotFound => "Post not found",
            ErrorCode::StatusNotFound => "Status not found",
            ErrorCode::DepartmentNotFound => "Department not found",
            ErrorCode::TicketTypeNotFound => "Ticket type not found",
            ErrorCode::MemberNotFound => "User not found",

            ErrorCode::OpenStatusMissing => "The 'Open' status is not configured",
            ErrorCode::DatabaseError => "A database error occurred",
            ErrorCode::FileStorageError => "Failed to store the attachment",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::TokenGenerationFailed => "Failed to issue a token",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError |
            ErrorCode::MissingStatusId |
            ErrorCode::MissingDepartmentId |
            ErrorCode::MissingUserId |
            ErrorCode::InvalidAttachment |
            ErrorCode::DuplicateAccount |
            ErrorCode::InvalidCredentials |
            ErrorCode::NotRefreshToken |
            ErrorCode::InvalidRefreshToken => StatusCode::BAD_REQUEST,

            ErrorCode::AuthenticationFailed |
            ErrorCode::InvalidAuthToken => StatusCode::UNAUTHORIZED,

            ErrorCode::TicketNotFound |
            ErrorCode::PostNotFound |
            ErrorCode::StatusNotFound |
            ErrorCode::DepartmentNotFound |
            ErrorCode::TicketTypeNotFound |
            ErrorCode::MemberNotFound => StatusCode::NOT_FOUND,

            ErrorCode::OpenStatusMissing |
            ErrorCode::DatabaseError |
            ErrorCode::FileStorageError |
            ErrorCode::InternalError |
            ErrorCode::TokenGenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

impl ValidationFieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ApiError(ErrorCode, Option<String>),

    #[error("validation failed: {0:?}")]
    ValidationError(Vec<ValidationFieldError>),
}

impl AppError {
    pub fn new(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        AppError::ApiError(code, Some(detail.into()))
    }

    pub fn bad_request(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn unauthorized(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn not_found(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn internal_error(code: ErrorCode) -> Self {
        Self::new(code)
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::ValidationError(vec![ValidationFieldError::new(field, message)])
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ApiError(code, _) => *code,
            AppError::ValidationError(_) => ErrorCode::ValidationError,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code().status_code() == StatusCode::NOT_FOUND
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        tracing::error!(error = %err, "데이터베이스 오류 발생");
        AppError::new(ErrorCode::DatabaseError)
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<ValidationFieldError>,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.code().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let response = match self {
            AppError::ApiError(code, detail) => ErrorResponse {
                code: format!("{:?}", code),
                message: code.message().to_string(),
                detail: detail.clone(),
                errors: Vec::new(),
            },
            AppError::ValidationError(errors) => ErrorResponse {
                code: format!("{:?}", ErrorCode::ValidationError),
                message: ErrorCode::ValidationError.message().to_string(),
                detail: None,
                errors: errors.clone(),
            },
        };

        HttpResponse::build(self.status_code()).json(response)
    }
}
