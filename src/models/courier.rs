use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::ContactSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub push_token: Option<String>,
    pub available: bool,
    pub active: bool,
    pub current_orders_count: u32,
    pub total_orders_completed: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    pub fn new(name: String, phone: String, email: String, push_token: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            phone,
            email,
            push_token,
            available: true,
            active: true,
            current_orders_count: 0,
            total_orders_completed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contact_snapshot(&self) -> ContactSnapshot {
        ContactSnapshot {
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
        }
    }

    /// Eligible to receive new-order broadcasts and to claim orders.
    pub fn is_eligible(&self) -> bool {
        self.active && self.available
    }
}
