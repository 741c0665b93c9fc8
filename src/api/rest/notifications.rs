use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::notification::Notification;
use crate::notify::inbox;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/:id/read", post(mark_read))
        .route("/notifications/read-all", post(mark_all_read))
}

#[derive(Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Serialize)]
struct NotificationListResponse {
    notifications: Vec<Notification>,
    metadata: InboxMeta,
}

#[derive(Serialize)]
struct InboxMeta {
    total: usize,
    unread: usize,
    limit: usize,
    skip: usize,
    has_more: bool,
}

#[derive(Serialize)]
struct UnreadCountResponse {
    unread: usize,
}

#[derive(Serialize)]
struct MarkAllReadResponse {
    updated: usize,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<NotificationListQuery>,
) -> Json<NotificationListResponse> {
    let listing = inbox::list(
        &state,
        actor.id,
        actor.role,
        query.unread_only,
        query.limit,
        query.skip,
    );

    Json(NotificationListResponse {
        notifications: listing.page.items,
        metadata: InboxMeta {
            total: listing.page.meta.total,
            unread: listing.unread,
            limit: listing.page.meta.limit,
            skip: listing.page.meta.skip,
            has_more: listing.page.meta.has_more,
        },
    })
}

async fn unread_count(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Json<UnreadCountResponse> {
    Json(UnreadCountResponse {
        unread: inbox::unread_count(&state, actor.id, actor.role),
    })
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !inbox::mark_read(&state, id, actor.id, actor.role) {
        return Err(AppError::NotFound(format!("notification {id} not found")));
    }

    Ok(Json(serde_json::json!({
        "message": "notification marked as read"
    })))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Json<MarkAllReadResponse> {
    Json(MarkAllReadResponse {
        updated: inbox::mark_all_read(&state, actor.id, actor.role),
    })
}
