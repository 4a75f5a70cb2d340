use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use notifeed_types::SocialEvent;
use notifeed_types::api::EventAccepted;

use crate::state::{AppState, join_error, status_for};

/// Turns a social event into a notification and appends it to the recipient's feed.
pub async fn post_event(
    State(state): State<AppState>,
    Json(event): Json<SocialEvent>,
) -> Result<impl IntoResponse, StatusCode> {
    let notification = event.to_notification();
    let user_id = event.recipient_id();
    let time = notification.time();
    let kind = notification.kind();

    let feed = state.feed.clone();
    tokio::task::spawn_blocking(move || feed.save(&notification))
        .await
        .map_err(join_error)?
        .map_err(status_for)?;

    info!(%user_id, %kind, "notification saved");
    Ok((StatusCode::CREATED, Json(EventAccepted { user_id, time })))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
