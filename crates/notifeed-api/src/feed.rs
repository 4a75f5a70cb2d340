use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use notifeed_db::{FeedError, FeedSession, ReadOptions};
use notifeed_types::api::{CountResponse, FeedQuery, FeedResponse, LastReadResponse};
use notifeed_types::unix_now;

use crate::render::badge;
use crate::state::{AppState, join_error, status_for};

/// The notifications page: trims the feed, reads it newest first, then marks
/// everything up to now as pending-read. The watermark moves on the next confirm.
pub async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let st = state.clone();
    let page = tokio::task::spawn_blocking(move || {
        let session = FeedSession::new(st.feed.clone(), user_id);
        let policy = st.retention.policy(unix_now());
        let page = session.notifications(ReadOptions {
            unread_only: query.unread_only,
            cleanup: Some(&policy),
        })?;
        session.mark_viewed()?;
        Ok::<_, FeedError>(page)
    })
    .await
    .map_err(join_error)?
    .map_err(status_for)?;

    let skipped = page.failures.len();
    let notifications = page
        .entries
        .into_iter()
        .map(|entry| state.renderers.entry(entry))
        .collect();

    Ok(Json(FeedResponse {
        notifications,
        skipped,
    }))
}

pub async fn count_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let feed = state.feed.clone();
    let (total, new) = tokio::task::spawn_blocking(move || {
        let session = FeedSession::new(feed, user_id);
        Ok::<_, FeedError>((
            session.count_notifications()?,
            session.count_new_notifications()?,
        ))
    })
    .await
    .map_err(join_error)?
    .map_err(status_for)?;

    Ok(Json(CountResponse {
        total,
        new,
        badge: badge(new, state.badge_cap),
    }))
}

/// Promotes the pending watermark left by the last page view.
pub async fn confirm_last_read(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let feed = state.feed.clone();
    let last_read = tokio::task::spawn_blocking(move || {
        let session = FeedSession::new(feed, user_id);
        match session.confirm_last_read()? {
            Some(confirmed) => Ok(confirmed),
            None => {
                debug!(%user_id, "nothing pending to confirm");
                session.last_read()
            }
        }
    })
    .await
    .map_err(join_error)?
    .map_err(status_for)?;

    Ok(Json(LastReadResponse { last_read }))
}

/// Drops the feed and both watermarks, e.g. when the user account is deleted.
pub async fn purge_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let feed = state.feed.clone();
    tokio::task::spawn_blocking(move || FeedSession::new(feed, user_id).purge())
        .await
        .map_err(join_error)?
        .map_err(status_for)?;

    Ok(StatusCode::NO_CONTENT)
}
