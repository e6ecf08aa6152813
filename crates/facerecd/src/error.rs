use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::engine::EngineError;

/// Failure of a single HTTP request. Never fatal to the daemon.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(EngineError::Extract(e)) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facerec_core::detector::DetectorError;
    use facerec_core::ExtractError;

    #[test]
    fn test_validation_is_bad_request() {
        assert_eq!(ApiError::bad_request("missing").status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_face_count_errors_are_bad_request() {
        let no_face = ApiError::from(EngineError::Extract(ExtractError::NoFace));
        let many = ApiError::from(EngineError::Extract(ExtractError::MultipleFaces { count: 3 }));
        let undecodable = ApiError::from(EngineError::Extract(ExtractError::Decode("bad".into())));
        assert_eq!(no_face.status(), StatusCode::BAD_REQUEST);
        assert_eq!(many.status(), StatusCode::BAD_REQUEST);
        assert_eq!(undecodable.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_engine_failures_are_server_errors() {
        let closed = ApiError::from(EngineError::ChannelClosed);
        let inference = ApiError::from(EngineError::Extract(ExtractError::Detector(
            DetectorError::InferenceFailed("oops".into()),
        )));
        assert_eq!(closed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(inference.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_message_passes_through() {
        let err = ApiError::from(EngineError::Extract(ExtractError::NoFace));
        assert_eq!(err.to_string(), "could not find any face in the given training image");
    }
}
