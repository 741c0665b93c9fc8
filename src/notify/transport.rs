use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::actor::Role;

/// One push message addressed to one device token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub token: String,
    pub recipient_id: Uuid,
    pub role: Role,
    pub title: String,
    pub body: String,
    pub payload: HashMap<String, String>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("push send failed: {0}")]
    Send(String),

    #[error("batched push send failed: {0}")]
    Batch(String),
}

/// The unreliable external push sender. Implementations may fail a
/// single message (`send`) or a whole batch up front (`send_batch`);
/// per-recipient failures inside a batch only surface through the
/// sequential fallback path.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), TransportError>;

    async fn send_batch(&self, messages: &[PushMessage]) -> Result<(), TransportError>;
}

/// In-process transport publishing onto the broadcast feed served at
/// /ws. A feed with no subscribers drops messages without error; push
/// delivery is an enhancement, not the source of truth.
pub struct ChannelTransport {
    feed: broadcast::Sender<PushMessage>,
}

impl ChannelTransport {
    pub fn new(feed: broadcast::Sender<PushMessage>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl PushTransport for ChannelTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), TransportError> {
        let _ = self.feed.send(message.clone());
        Ok(())
    }

    async fn send_batch(&self, messages: &[PushMessage]) -> Result<(), TransportError> {
        for message in messages {
            let _ = self.feed.send(message.clone());
        }
        Ok(())
    }
}
