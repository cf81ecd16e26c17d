//! # API Module
//!
//! Reference HTTP server for the contract.
//!
//! ## Routes
//!
//! | Method | Path | Key |
//! |---|---|---|
//! | GET, POST | `/v1/organizations/invites` | admin |
//! | GET, DELETE | `/v1/organizations/invites/{invite_id}` | admin |
//! | GET, POST | `/v1/organizations/workspaces` | admin |
//! | GET, POST | `/v1/organizations/workspaces/{workspace_id}` | admin |
//! | POST | `/v1/organizations/workspaces/{workspace_id}/archive` | admin |
//! | GET, POST | `/v1/messages/batches` | workspace |
//! | GET, DELETE | `/v1/messages/batches/{message_batch_id}` | workspace |
//! | POST | `/v1/messages/batches/{message_batch_id}/cancel` | workspace |
//! | GET | `/v1/messages/batches/{message_batch_id}/results` | workspace |
//!
//! ## Layers (outermost first)
//!
//! tracing → CORS → rate limit → `anthropic-version` → `x-api-key`

pub mod auth;
pub mod error;
pub mod handlers;

use crate::clock::{Clock, SystemClock};
use admiral_core::Registry;
use auth::KeyRing;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest request body accepted by default (batch submissions can be big).
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub keys: Arc<KeyRing>,
    pub clock: Arc<dyn Clock>,
    pub limiter: Option<Arc<DefaultDirectRateLimiter>>,
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("registry", &self.registry)
            .field("keys", &self.keys)
            .field("rate_limited", &self.limiter.is_some())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl AppState {
    pub fn new(registry: Registry, keys: KeyRing) -> Self {
        Self {
            registry: Arc::new(registry),
            keys: Arc::new(keys),
            clock: Arc::new(SystemClock),
            limiter: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Limit the whole server to `per_second` requests. Zero disables it.
    #[must_use]
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.limiter = NonZeroU32::new(per_second)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}

/// Build the complete router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin = Router::new()
        .route(
            "/v1/organizations/invites",
            get(handlers::list_invites).post(handlers::create_invite),
        )
        .route(
            "/v1/organizations/invites/{invite_id}",
            get(handlers::get_invite).delete(handlers::delete_invite),
        )
        .route(
            "/v1/organizations/workspaces",
            get(handlers::list_workspaces).post(handlers::create_workspace),
        )
        .route(
            "/v1/organizations/workspaces/{workspace_id}",
            get(handlers::get_workspace).post(handlers::update_workspace),
        )
        .route(
            "/v1/organizations/workspaces/{workspace_id}/archive",
            post(handlers::archive_workspace),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    let workspace = Router::new()
        .route(
            "/v1/messages/batches",
            get(handlers::list_batches).post(handlers::create_batch),
        )
        .route(
            "/v1/messages/batches/{message_batch_id}",
            get(handlers::get_batch).delete(handlers::delete_batch),
        )
        .route(
            "/v1/messages/batches/{message_batch_id}/cancel",
            post(handlers::cancel_batch),
        )
        .route(
            "/v1/messages/batches/{message_batch_id}/results",
            get(handlers::batch_results),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_workspace,
        ));

    Router::new()
        .merge(admin)
        .merge(workspace)
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(middleware::from_fn(auth::require_version))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

// =============================================================================
// SERVER
// =============================================================================

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    sweep_every: Duration,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state, sweep_every, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    state: AppState,
    sweep_every: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let sweeper = spawn_sweeper(state.clone(), sweep_every);
    tracing::info!(addr = %listener.local_addr()?, "admiral listening");

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    tracing::info!("admiral stopped");
    result
}

/// Periodically settle canceling and expired batches.
///
/// Returns `None` when `every` is zero.
pub fn spawn_sweeper(state: AppState, every: Duration) -> Option<tokio::task::JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let registry = Arc::clone(&state.registry);
            let now = state.clock.now();
            match tokio::task::spawn_blocking(move || registry.sweep(now)).await {
                Ok(Ok(0)) => {}
                Ok(Ok(ended)) => tracing::info!(ended, "sweep settled message batches"),
                Ok(Err(err)) => tracing::error!(error = %err, "sweep failed"),
                Err(err) => tracing::error!(error = %err, "sweep task failed"),
            }
        }
    }))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
