use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/v1/students/{student_id}", student_routes().layer(cors))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(
                    middlewares::trace::trace_context_middleware,
                ))
                .layer(middleware::from_fn(
                    middlewares::metrics::metrics_middleware,
                ))
                .layer(CompressionLayer::new()),
        )
}

fn student_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/planets", get(handlers::progress::list_planets))
        .route(
            "/planets/{planet_id}/levels",
            get(handlers::progress::level_map),
        )
        .route("/dashboard", get(handlers::progress::dashboard))
        .route(
            "/quiz",
            post(handlers::quiz::start_quiz)
                .get(handlers::quiz::get_quiz)
                .delete(handlers::quiz::exit_quiz),
        )
        .route("/quiz/answer", post(handlers::quiz::submit_answer))
        .route("/quiz/hint", post(handlers::quiz::request_hint))
        .route("/quiz/next", post(handlers::quiz::next_exercise))
        .route("/quiz/stream", get(handlers::sse::quiz_stream))
}
