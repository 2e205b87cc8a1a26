use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;

use super::responses::{MessageResponse, ProfileResponse, SigninResponse};
use crate::modules::auth::service::SIGNIN_MESSAGE;
use crate::modules::auth::{AuthError, AuthService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuthService>,
    pub io_timeout: Duration,
}

impl AppState {
    pub fn new(service: AuthService, io_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            io_timeout,
        }
    }
}

/// `POST /signup` body. Fields are optional so that a missing one is reported
/// as a malformed request rather than a deserialization error.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub fname: Option<String>,
    pub lname: Option<String>,
}

/// `POST /signin` body
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Unwrap a JSON body, mapping every rejection to the same malformed-request failure
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            log::debug!("Rejected request body: {}", rejection);
            Err(AuthError::MalformedRequest)
        }
    }
}

/// Run a read-only service call on the blocking pool, bounded by the configured timeout
async fn run_blocking<T, F>(state: &AppState, call: F) -> Result<T, AuthError>
where
    F: FnOnce(&AuthService) -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    let task = tokio::task::spawn_blocking(move || call(service.as_ref()));

    match tokio::time::timeout(state.io_timeout, task).await {
        Ok(joined) => joined.unwrap_or_else(|e| Err(AuthError::Internal(e.to_string()))),
        Err(_) => Err(AuthError::Timeout),
    }
}

/// Run a mutating service call on the blocking pool
///
/// The call receives the deadline and must not start writing once it has
/// passed. A blocking task cannot be cancelled, so when the timer fires first
/// the handler still waits for the task and reports what it actually did.
async fn run_write<T, F>(state: &AppState, call: F) -> Result<T, AuthError>
where
    F: FnOnce(&AuthService, Instant) -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    let service = Arc::clone(&state.service);
    let deadline = Instant::now() + state.io_timeout;
    let mut task = tokio::task::spawn_blocking(move || call(service.as_ref(), deadline));

    let joined = match tokio::time::timeout(state.io_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => {
            log::warn!(
                "Write still running after {:?}, waiting for it to settle",
                state.io_timeout
            );
            task.await
        }
    };
    joined.unwrap_or_else(|e| Err(AuthError::Internal(e.to_string())))
}

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), AuthError> {
    let request = parse_body(body)?;
    let (Some(username), Some(password), Some(fname), Some(lname)) =
        (request.username, request.password, request.fname, request.lname)
    else {
        return Err(AuthError::MalformedRequest);
    };

    let message = run_write(&state, move |service, deadline| {
        service.signup_before(&username, &password, &fname, &lname, Some(deadline))
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            result: true,
            message: message.to_string(),
        }),
    ))
}

pub async fn signin(
    State(state): State<AppState>,
    body: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Json<SigninResponse>, AuthError> {
    let request = parse_body(body)?;
    let (Some(username), Some(password)) = (request.username, request.password) else {
        return Err(AuthError::MalformedRequest);
    };

    let jwt = run_blocking(&state, move |service| service.signin(&username, &password)).await?;

    Ok(Json(SigninResponse {
        result: true,
        jwt,
        message: SIGNIN_MESSAGE.to_string(),
    }))
}

pub async fn whoami(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, AuthError> {
    // A header that is not valid UTF-8 cannot hold a token
    let credential = match headers.get(header::AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| AuthError::InvalidToken)?
                .to_string(),
        ),
        None => None,
    };

    let profile =
        run_blocking(&state, move |service| service.whoami(credential.as_deref())).await?;

    Ok(Json(ProfileResponse {
        result: true,
        data: profile,
    }))
}
