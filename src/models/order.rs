use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
}

/// Contact info frozen into the order at the moment of a lifecycle
/// transition. Never re-joined against the live user/courier record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notes: String,
    pub address: String,
    pub user_info: ContactSnapshot,
    pub status: OrderStatus,
    pub courier_id: Option<Uuid>,
    pub courier_info: Option<ContactSnapshot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(user_id: Uuid, notes: String, address: String, user_info: ContactSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            notes,
            address,
            user_info,
            status: OrderStatus::Pending,
            courier_id: None,
            courier_info: None,
            created_at: now,
            updated_at: now,
            assigned_at: None,
            completed_at: None,
        }
    }
}
