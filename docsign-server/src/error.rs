//! HTTP error mapping

use bytes::Bytes;
use docsign_core::DocSignError;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::{Response, StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DocSignError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Not found")]
    RouteNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(e) => match e {
                DocSignError::DuplicateIdentity
                | DocSignError::AuthenticationFailed
                | DocSignError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                DocSignError::Unauthenticated | DocSignError::InvalidToken(_) => {
                    StatusCode::UNAUTHORIZED
                }
                DocSignError::NotFound => StatusCode::NOT_FOUND,
                DocSignError::AlreadySigned => StatusCode::CONFLICT,
                DocSignError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                DocSignError::SigningFailed(_)
                | DocSignError::InvalidConfig(_)
                | DocSignError::Storage(_)
                | DocSignError::Serialization(_)
                | DocSignError::Io(_)
                | DocSignError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RouteNotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show a client. Server-side detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Domain(DocSignError::SigningFailed(_)) => "Signing failed".to_string(),
            ApiError::Domain(DocSignError::InvalidToken(_)) => {
                DocSignError::Unauthenticated.to_string()
            }
            e if e.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                "Internal server error".to_string()
            }
            e => e.to_string(),
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = json!({ "error": self.public_message() }).to_string();
        let mut response = json_response(status, body);
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<multer::Error> for ApiError {
    fn from(e: multer::Error) -> Self {
        ApiError::BadRequest(format!("malformed multipart body: {}", e))
    }
}

/// JSON response with the given status
pub fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DocSignError::DuplicateIdentity, StatusCode::BAD_REQUEST),
            (DocSignError::AuthenticationFailed, StatusCode::BAD_REQUEST),
            (DocSignError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (DocSignError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (DocSignError::NotFound, StatusCode::NOT_FOUND),
            (DocSignError::AlreadySigned, StatusCode::CONFLICT),
            (DocSignError::PayloadTooLarge { limit: 1 }, StatusCode::PAYLOAD_TOO_LARGE),
            (DocSignError::SigningFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DocSignError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn unauthorized_carries_challenge() {
        let response = ApiError::from(DocSignError::Unauthenticated).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::from(DocSignError::Storage("disk at /var/lib exploded".into()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = ApiError::from(DocSignError::SigningFailed("lopdf parse offset 12".into()));
        assert_eq!(err.public_message(), "Signing failed");
    }

    #[test]
    fn client_messages_are_kept() {
        assert_eq!(
            ApiError::from(DocSignError::DuplicateIdentity).public_message(),
            "Email already exists"
        );
        assert_eq!(ApiError::from(DocSignError::NotFound).public_message(), "Not found");
    }
}
