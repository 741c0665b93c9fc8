use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::actor::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    OrderAssigned,
    OrderCompleted,
    General,
}

/// Durable per-recipient notification record. Written exactly once per
/// (recipient, send attempt); transport success or failure never changes
/// whether the record exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub role: Role,
    pub title: String,
    pub body: String,
    pub payload: HashMap<String, String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub related_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
