//! HTTP surface: `POST /signup`, `POST /signin`, `GET /user/me`.
//!
//! Thin axum wrapper around `AuthService`. Every failure comes back as
//! `{"result": false, "error": ...}`.

pub mod handlers;
pub mod responses;
pub mod routes;

pub use handlers::AppState;
pub use routes::{create_router, serve};
