use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::models::courier::Courier;
use crate::models::notification::Notification;
use crate::models::order::Order;
use crate::models::user::User;
use crate::notify::NotificationJob;
use crate::notify::transport::PushMessage;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub users: DashMap<Uuid, User>,
    pub couriers: DashMap<Uuid, Courier>,
    pub orders: DashMap<Uuid, Order>,
    pub notifications: DashMap<Uuid, Notification>,
    pub outbox_tx: mpsc::Sender<NotificationJob>,
    pub push_feed_tx: broadcast::Sender<PushMessage>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        outbox_queue_size: usize,
        push_feed_buffer: usize,
    ) -> (Self, mpsc::Receiver<NotificationJob>) {
        let (outbox_tx, outbox_rx) = mpsc::channel(outbox_queue_size);
        let (push_feed_tx, _unused_rx) = broadcast::channel(push_feed_buffer);

        (
            Self {
                users: DashMap::new(),
                couriers: DashMap::new(),
                orders: DashMap::new(),
                notifications: DashMap::new(),
                outbox_tx,
                push_feed_tx,
                metrics: Metrics::new(),
            },
            outbox_rx,
        )
    }
}
