// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::comment, state::AppState};

/// Assembles the main application router.
///
/// * Mounts the comment routes under `/api/comments`.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (comment use case + config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let comment_routes = Router::new()
        .route("/", get(comment::list_comments).post(comment::create_comment))
        .route("/{id}", delete(comment::delete_comment))
        .route("/{id}/like", post(comment::like_comment))
        .route("/{id}/unlike", post(comment::unlike_comment));

    Router::new()
        .nest("/api/comments", comment_routes)
        // Global Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
