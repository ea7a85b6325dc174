use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Debug, Serialize, strum_macros::AsRefStr)]
#[serde(tag = "type", content = "data")]
pub enum Error {
    // -- Config errors.
    ConfigMissing { var: String },
    EnvVarError(String),
    StorageAuthFailed { reason: String },

    // -- Request context errors.
    NoUserId,
    UserNotAuthenticated,

    // -- Validation errors.
    InvalidInput { reason: String },
    InvalidUsername,
    InvalidUpload { reason: String },

    // -- Upstream errors.
    DbError(String),
    StorageError(String),
    HttpError(String),
    IoError(String),

    // -- Not found.
    SongNotFound { id: String },
    FileNotFound { key: String },
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, client_error) = self.client_status_and_error();

        if status_code.is_server_error() {
            tracing::error!("{:?}", self);
        }

        let response_body = serde_json::json!({
            "error": client_error.as_ref(),
            "details": self.client_details()
        });

        (status_code, Json(response_body)).into_response()
    }
}

impl Error {
    pub fn client_status_and_error(&self) -> (StatusCode, ClientError) {
        match self {
            Self::NoUserId | Self::UserNotAuthenticated => {
                (StatusCode::UNAUTHORIZED, ClientError::NO_AUTH)
            }

            Self::InvalidInput { .. } | Self::InvalidUsername | Self::InvalidUpload { .. } => {
                (StatusCode::BAD_REQUEST, ClientError::INVALID_PARAMS)
            }

            Self::SongNotFound { .. } | Self::FileNotFound { .. } => {
                (StatusCode::NOT_FOUND, ClientError::RESOURCE_NOT_FOUND)
            }

            Self::ConfigMissing { .. }
            | Self::EnvVarError(_)
            | Self::StorageAuthFailed { .. }
            | Self::DbError(_)
            | Self::StorageError(_)
            | Self::HttpError(_)
            | Self::IoError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ClientError::SERVICE_ERROR,
            ),
        }
    }

    /// Upstream details stay in the logs; they can carry internal URLs or tokens.
    fn client_details(&self) -> String {
        match self {
            Self::InvalidInput { reason } | Self::InvalidUpload { reason } => reason.clone(),
            Self::InvalidUsername => "Username must be 1-10 characters".to_string(),
            Self::NoUserId => "User ID required".to_string(),
            Self::UserNotAuthenticated => "User not found or not authenticated".to_string(),
            Self::SongNotFound { id } => format!("Song not found: {id}"),
            Self::FileNotFound { .. } => "File not found".to_string(),
            other => other.as_ref().to_string(),
        }
    }
}

#[derive(Debug, strum_macros::AsRefStr)]
#[allow(non_camel_case_types)]
pub enum ClientError {
    NO_AUTH,
    INVALID_PARAMS,
    SERVICE_ERROR,
    RESOURCE_NOT_FOUND,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::HttpError(format!("request timed out: {err}"))
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::DbError(format!("malformed payload: {err}"))
    }
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::EnvVarError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<lofty::error::LoftyError> for Error {
    fn from(err: lofty::error::LoftyError) -> Self {
        Error::InvalidUpload {
            reason: format!("Unable to read audio file metadata: {err}"),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Error::InvalidUpload {
            reason: err.body_text(),
        }
    }
}
