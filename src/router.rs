use axum::{Router, routing::post};
use tower_http::trace::TraceLayer;

use crate::{AppState, middleware::log_errors, routes};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/check-user", post(routes::check_user::check_user))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
