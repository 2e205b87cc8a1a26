use std::error::Error;
use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{from_fn, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use log::info;
use tokio::net::TcpListener;

use super::handlers::{self, AppState};
use crate::modules::auth::AuthService;
use crate::modules::config::AuthConfig;

/// Router with all endpoints and request logging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/signup", post(handlers::signup))
        .route("/signin", post(handlers::signin))
        .route("/user/me", get(handlers::whoami))
        .layer(from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Build the service from `config` and serve until Ctrl-C
pub async fn serve(config: AuthConfig) -> Result<(), Box<dyn Error>> {
    let service = AuthService::new(&config)?;
    let app = create_router(AppState::new(service, config.io_timeout));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!(
        "Listening on {} (users file: {})",
        addr,
        config.users_file.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, keep serving
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
