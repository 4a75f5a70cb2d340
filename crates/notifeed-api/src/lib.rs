pub mod events;
pub mod feed;
pub mod render;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

pub use state::{AppState, AppStateInner, RetentionRule};

/// Every notification route, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(events::health))
        .route("/events", post(events::post_event))
        .route(
            "/users/{user_id}/notifications",
            get(feed::list_notifications).delete(feed::purge_notifications),
        )
        .route(
            "/users/{user_id}/notifications/count",
            get(feed::count_notifications),
        )
        .route(
            "/users/{user_id}/notifications/last_read",
            post(feed::confirm_last_read),
        )
        .with_state(state)
}
