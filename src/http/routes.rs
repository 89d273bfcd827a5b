use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route("/users/me", get(handlers::get_current_user))
}

pub fn subscriptions() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions).post(handlers::create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(handlers::get_subscription)
                .patch(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
}

pub fn admin() -> Router<AppState> {
    Router::new().route(
        "/admin/notifications/run",
        post(handlers::run_notifications),
    )
}
