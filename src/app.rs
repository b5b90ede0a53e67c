use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/signup", post(handlers::register))
        .route("/register", post(handlers::register))
        .route("/api/register", post(handlers::register))
        .route("/api/token/refresh", post(handlers::refresh_token))
        .route("/api/user/current", get(handlers::current_user))
        .route("/api/user/calories", get(handlers::get_calories))
        .route("/api/user/email/:email", get(handlers::user_by_email))
        .route("/api/user/:id", get(handlers::user_by_id))
        .route("/api/calories", get(handlers::get_calories))
        .route("/api/calories/add", post(handlers::add_calories))
        .route("/api/calories/goal", put(handlers::set_goal))
        .route("/api/calories/reset", post(handlers::reset_today))
        .route("/api/calories/weekly", get(handlers::weekly_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
