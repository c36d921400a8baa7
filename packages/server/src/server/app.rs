//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::kernel::{
    Dispatcher, JobStore, PostgresAuditWriter, PostgresJobStore, ProviderRegistry, RetryPolicy,
};
use crate::server::auth::JwtService;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    enqueue_handler, health_handler, manual_send_handler, retry_handler, trigger_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub jwt_service: Arc<JwtService>,
    pub automation_secret: Option<String>,
    pub batch_limit: i64,
}

/// Build the route tree over an already-assembled state.
///
/// Split from [`build_app`] so tests can run the exact production routes and
/// middleware against in-memory dependencies.
pub fn build_router(state: AppState) -> Router {
    let jwt_service = state.jwt_service.clone();

    Router::new()
        .route("/automation/trigger", post(trigger_handler))
        .route("/automation/retry", post(retry_handler))
        .route("/automation/enqueue", post(enqueue_handler))
        .route("/automation/manual-send", post(manual_send_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(state))
}

/// Build the Axum application from configuration and a connected pool.
pub fn build_app(config: &Config, pool: PgPool) -> Router {
    let store: Arc<dyn JobStore> = Arc::new(PostgresJobStore::new(pool.clone()));
    let audit = Arc::new(PostgresAuditWriter::new(pool));
    let providers = ProviderRegistry::from_config(config);
    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        base_delay_ms: config.base_delay_ms,
    };
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        providers,
        audit,
        policy,
        Duration::from_secs(config.provider_timeout_secs),
    ));
    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let state = AppState {
        store,
        dispatcher,
        jwt_service,
        automation_secret: config.automation_secret.clone(),
        batch_limit: config.batch_limit,
    };

    // CORS configuration - allow any origin for development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    // Rate limiting: 10 requests per second per IP with burst of 20.
    // Prevents trigger storms from re-running cycles back to back.
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .use_headers() // Extract IP from X-Forwarded-For header
            .finish()
            .expect("Rate limiter configuration is valid and should never fail"),
    );

    build_router(state)
        .layer(GovernorLayer {
            config: rate_limit_config,
        })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
