use crate::application_port::*;
use crate::logger::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::{Rejection, Reply, reject};

/// The one failure type handlers and filters reject with. `recover_error`
/// turns it into the error envelope.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Vec<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal<E: std::fmt::Display>(error: E) -> Self {
        warn!("Internal error: {}", error);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
    }

    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    /// Every way a refresh can fail is a 401 to the client; store trouble
    /// stays a 500.
    pub fn refresh_rejected(error: AuthError) -> Self {
        match error {
            AuthError::TokenExpired => Self::unauthorized("Refresh token is expired"),
            AuthError::TokenMismatch => Self::unauthorized("Refresh token is expired or used"),
            AuthError::TokenInvalid | AuthError::IdentityNotFound => {
                Self::unauthorized("Invalid refresh token")
            }
            other => ApiError::from(other),
        }
    }
}

impl reject::Reject for ApiError {}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => Self::unauthorized("Invalid user credentials"),
            AuthError::UserExists => Self::new(
                StatusCode::CONFLICT,
                "User with email or username already exists",
            ),
            AuthError::IdentityNotFound => Self::new(StatusCode::NOT_FOUND, "User does not exist"),
            AuthError::TokenInvalid => Self::unauthorized("Invalid token"),
            AuthError::TokenExpired => Self::unauthorized("Token expired"),
            AuthError::TokenMismatch => Self::unauthorized("Token is expired or used"),
            AuthError::Unauthorized(message) => Self::unauthorized(message),
            AuthError::Validation(message) => Self::bad_request(message),
            AuthError::Media(e) => {
                warn!("Media upload failed: {}", e);
                Self::bad_request("Error while uploading file").with_errors(vec![e])
            }
            AuthError::Persistence(e) => Self::internal(e),
            AuthError::InternalError(e) => Self::internal(e),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub data: Option<()>,
    pub message: String,
    pub success: bool,
    pub errors: Vec<String>,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        ErrorBody {
            status_code: err.status.as_u16(),
            data: None,
            message: err.message.clone(),
            success: false,
            errors: err.errors.clone(),
        }
    }
}

fn reply(err: &ApiError) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody::from(err)), err.status).into_response()
}

/// Single translation point from any rejection to the error envelope.
pub async fn recover_error(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    if let Some(api_err) = err.find::<ApiError>() {
        return Ok(reply(api_err));
    }

    let api_err = if let Some(e) = err.find::<BodyDeserializeError>() {
        ApiError::bad_request("Invalid request body").with_errors(vec![e.to_string()])
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
    } else if err.find::<reject::LengthRequired>().is_some() {
        ApiError::new(StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        ApiError::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type")
    } else if let Some(e) = err.find::<reject::MissingHeader>() {
        ApiError::bad_request(e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidHeader>() {
        ApiError::bad_request(e.to_string())
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.is_not_found() {
        ApiError::new(StatusCode::NOT_FOUND, "Route not found")
    } else {
        error!("Unhandled rejection: {:?}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
    };

    Ok(reply(&api_err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_statuses() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::UserExists, StatusCode::CONFLICT),
            (AuthError::IdentityNotFound, StatusCode::NOT_FOUND),
            (AuthError::TokenMismatch, StatusCode::UNAUTHORIZED),
            (AuthError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                AuthError::Persistence("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn internal_detail_does_not_leak() {
        let err = ApiError::from(AuthError::Persistence("password=hunter2".into()));
        assert!(!err.message.contains("hunter2"));
    }

    #[test]
    fn refresh_failures_are_all_401_except_store_trouble() {
        for error in [
            AuthError::TokenExpired,
            AuthError::TokenInvalid,
            AuthError::TokenMismatch,
            AuthError::IdentityNotFound,
        ] {
            assert_eq!(
                ApiError::refresh_rejected(error).status,
                StatusCode::UNAUTHORIZED
            );
        }
        assert_eq!(
            ApiError::refresh_rejected(AuthError::Persistence("x".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_body_shape() {
        let body = ErrorBody::from(&ApiError::unauthorized("Unauthorized request"));
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "statusCode": 401,
                "data": null,
                "message": "Unauthorized request",
                "success": false,
                "errors": []
            })
        );
    }
}
