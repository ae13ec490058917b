//! Mapping of conversion errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::core::ConvertError;

/// Error body: `{"detail": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(err: &ConvertError) -> StatusCode {
    match err {
        ConvertError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ConvertError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ConvertError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        ConvertError::InvalidParameter(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ConvertError::NotFound => StatusCode::NOT_FOUND,
        ConvertError::DecodeError(_) | ConvertError::EncodeError(_) | ConvertError::StorageError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<ConvertError> for ApiError {
    fn from(err: ConvertError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            log::error!("Error during conversion: {}", err);
        } else {
            log::debug!("Rejected request ({}): {}", status, err);
        }

        Self {
            status,
            detail: err.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_documented_statuses() {
        let cases = [
            (ConvertError::TooLarge { size: 2, max: 1 }, 413),
            (
                ConvertError::UnsupportedFormat {
                    extension: Some(".png".to_string()),
                    allowed: vec![".heic".to_string()],
                },
                415,
            ),
            (ConvertError::InvalidImage("x".to_string()), 400),
            (ConvertError::DecodeError("x".to_string()), 500),
            (ConvertError::EncodeError("x".to_string()), 500),
            (ConvertError::StorageError(std::io::Error::other("disk full")), 500),
            (ConvertError::NotFound, 404),
            (ConvertError::InvalidParameter("x".to_string()), 422),
        ];

        for (err, expected) in cases {
            assert_eq!(status_for(&err).as_u16(), expected, "{:?}", err);
        }
    }

    #[test]
    fn server_errors_do_not_leak_diagnostics() {
        let api = ApiError::from(ConvertError::StorageError(std::io::Error::other("/srv/temp is read-only")));
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.detail.contains("/srv/temp"));
    }
}
