//! Read-only admin API over the running reconciler.
//!
//! # Endpoints
//! - `GET /admin/status`: version, uptime and last cycle of each loop
//! - `GET /admin/pending`: both working sets
//! - `GET /admin/journal`: submissions awaiting their status push
//!
//! Every endpoint requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::lifecycle::Shutdown;
use crate::reconciler::ReconcilerHandle;

/// Shared state of the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub reconciler: ReconcilerHandle,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/pending", get(get_pending))
        .route("/admin/journal", get(get_journal))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the admin API on `listener` until shutdown is triggered.
pub async fn serve(listener: TcpListener, state: AdminState, shutdown: Shutdown) -> std::io::Result<()> {
    let local_addr: SocketAddr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Admin API listening");

    let mut rx = shutdown.subscribe();
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = rx.recv().await;
        })
        .await
}
