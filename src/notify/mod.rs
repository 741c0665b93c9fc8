pub mod dispatcher;
pub mod inbox;
pub mod transport;
pub mod worker;

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::actor::Role;
use crate::models::notification::NotificationKind;

/// Who a dispatch is aimed at.
#[derive(Debug, Clone)]
pub enum Audience {
    /// One specific user or courier.
    Direct { recipient_id: Uuid, role: Role },
    /// Every eligible courier, resolved at dispatch time.
    EligibleCouriers,
}

/// Post-commit dispatch request handed from the lifecycle engine to the
/// dispatch worker over the outbox channel. The triggering state
/// transition has already committed by the time this exists.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    pub audience: Audience,
    pub title: String,
    pub body: String,
    pub payload: HashMap<String, String>,
    pub kind: NotificationKind,
    pub related_id: Option<Uuid>,
}

impl NotificationJob {
    pub fn to_user(
        recipient_id: Uuid,
        title: impl Into<String>,
        body: impl Into<String>,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> Self {
        Self {
            audience: Audience::Direct {
                recipient_id,
                role: Role::User,
            },
            title: title.into(),
            body: body.into(),
            payload: HashMap::new(),
            kind,
            related_id: Some(related_id),
        }
    }

    pub fn courier_broadcast(
        title: impl Into<String>,
        body: impl Into<String>,
        kind: NotificationKind,
        related_id: Uuid,
    ) -> Self {
        Self {
            audience: Audience::EligibleCouriers,
            title: title.into(),
            body: body.into(),
            payload: HashMap::new(),
            kind,
            related_id: Some(related_id),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Payload as sent over the wire and persisted: the caller-supplied
    /// entries plus the type tag and related id, all stringly typed as
    /// the push transport requires.
    pub fn wire_payload(&self) -> HashMap<String, String> {
        let mut payload = self.payload.clone();
        let kind = serde_json::to_value(self.kind)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| "general".to_string());
        payload.insert("type".to_string(), kind);
        if let Some(related_id) = self.related_id {
            payload.insert("related_id".to_string(), related_id.to_string());
        }
        payload
    }
}
