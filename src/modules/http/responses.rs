use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::modules::auth::{AuthError, Profile};

/// `{result: true, message}`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub result: bool,
    pub message: String,
}

/// `{result: true, jwt, message}`
#[derive(Debug, Serialize)]
pub struct SigninResponse {
    pub result: bool,
    pub jwt: String,
    pub message: String,
}

/// `{result: true, data: {fname, lname, password}}`
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub result: bool,
    pub data: Profile,
}

/// `{result: false, error}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub result: bool,
    pub error: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if !self.is_client_error() {
            log::error!("Request failed: {}", self);
        }

        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            result: false,
            error: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}
