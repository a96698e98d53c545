use axum::http::{self, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("account id conflict")]
    AccountConflict,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no available id: please access later")]
    IdExhaustion,
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("database error")]
    Database { source: sqlx::Error },
    #[error("password hash error: {0}")]
    PasswordHash(argon2::password_hash::Error),
    #[error("highlighting error")]
    Highlight {
        #[from]
        source: syntect::Error,
    },
    #[error("http error")]
    Http {
        #[from]
        source: http::Error,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AccountConflict => StatusCode::CONFLICT,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::IdExhaustion => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::MissingField(_) => StatusCode::BAD_REQUEST,
            ApiError::Database { .. }
            | ApiError::PasswordHash(_)
            | ApiError::Highlight { .. }
            | ApiError::Http { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            // log the full chain, hand the client an opaque body
            error!("internal error: {self:?}");
            return (status_code, "internal error").into_response();
        }

        (status_code, format!("{self}")).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            _ => ApiError::Database { source },
        }
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(source: argon2::password_hash::Error) -> Self {
        match source {
            argon2::password_hash::Error::Password => ApiError::InvalidCredentials,
            _ => ApiError::PasswordHash(source),
        }
    }
}
