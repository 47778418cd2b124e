use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::helpdesk::Helpdesk;

use super::handlers;

/// State shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub helpdesk: Arc<Helpdesk>,
}

pub fn build(helpdesk: Arc<Helpdesk>) -> Router {
    let state = AppState { helpdesk };

    Router::new()
        // Pages
        .route("/", get(handlers::form_page))
        .route("/query", post(handlers::submit_query))
        .route("/chat/{id}", get(handlers::chat_page))
        // API
        .route("/api/answer/{id}", post(handlers::get_answer))
        .route("/api/rating/{id}", post(handlers::submit_rating))
        .route("/healthz", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
