use tracing::{info, warn};
use uuid::Uuid;

use crate::models::actor::Role;
use crate::models::notification::Notification;
use crate::models::page::{Page, paginate};
use crate::state::AppState;

pub struct InboxPage {
    pub page: Page<Notification>,
    pub unread: usize,
}

/// A recipient's stored notifications, newest first.
pub fn list(
    state: &AppState,
    recipient_id: Uuid,
    role: Role,
    unread_only: bool,
    limit: usize,
    skip: usize,
) -> InboxPage {
    let mut items: Vec<Notification> = state
        .notifications
        .iter()
        .filter(|entry| {
            let n = entry.value();
            n.recipient_id == recipient_id && n.role == role && (!unread_only || !n.read)
        })
        .map(|entry| entry.value().clone())
        .collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let unread = unread_count(state, recipient_id, role);
    InboxPage {
        page: paginate(items, limit, skip),
        unread,
    }
}

pub fn unread_count(state: &AppState, recipient_id: Uuid, role: Role) -> usize {
    state
        .notifications
        .iter()
        .filter(|entry| {
            let n = entry.value();
            n.recipient_id == recipient_id && n.role == role && !n.read
        })
        .count()
}

/// Marks one notification read. Ownership-checked and idempotent: a
/// notification already read reports success without a write; one that
/// is missing or belongs to someone else reports failure.
pub fn mark_read(state: &AppState, notification_id: Uuid, recipient_id: Uuid, role: Role) -> bool {
    match state.notifications.get_mut(&notification_id) {
        Some(mut entry) if entry.recipient_id == recipient_id && entry.role == role => {
            if !entry.read {
                entry.read = true;
                info!(notification_id = %notification_id, "notification marked as read");
            }
            true
        }
        _ => {
            warn!(
                notification_id = %notification_id,
                recipient_id = %recipient_id,
                "notification not found for recipient"
            );
            false
        }
    }
}

/// Marks everything unread for the recipient as read; returns how many
/// records changed.
pub fn mark_all_read(state: &AppState, recipient_id: Uuid, role: Role) -> usize {
    let mut updated = 0;
    for mut entry in state.notifications.iter_mut() {
        let n = entry.value_mut();
        if n.recipient_id == recipient_id && n.role == role && !n.read {
            n.read = true;
            updated += 1;
        }
    }
    if updated > 0 {
        info!(recipient_id = %recipient_id, updated, "notifications marked as read");
    }
    updated
}
