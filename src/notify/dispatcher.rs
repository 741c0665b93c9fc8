use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::availability;
use crate::models::actor::Role;
use crate::models::notification::Notification;
use crate::notify::transport::{PushMessage, PushTransport, TransportError};
use crate::notify::{Audience, NotificationJob};
use crate::state::AppState;

/// Per-dispatch send tally. Callers only log these; a dispatch never
/// fails the business operation that triggered it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success_count: usize,
    pub failure_count: usize,
}

pub struct Dispatcher {
    transport: Arc<dyn PushTransport>,
    retry_delay: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, retry_delay: Duration) -> Self {
        Self {
            transport,
            retry_delay,
        }
    }

    /// Runs the dispatch protocol for one job: resolve recipients, try
    /// one batched send, fall back to sequential sends with a single
    /// retry each, then persist one Notification record per intended
    /// recipient no matter how the transport fared.
    pub async fn dispatch(&self, state: &AppState, job: &NotificationJob) -> DispatchOutcome {
        let payload = job.wire_payload();
        let messages = resolve_recipients(state, &job.audience)
            .into_iter()
            .map(|(recipient_id, role, token)| PushMessage {
                token,
                recipient_id,
                role,
                title: job.title.clone(),
                body: job.body.clone(),
                payload: payload.clone(),
            })
            .collect::<Vec<_>>();

        if messages.is_empty() {
            info!(kind = ?job.kind, "notification dispatch with no recipients");
            return DispatchOutcome::default();
        }

        let outcome = match self.transport.send_batch(&messages).await {
            Ok(()) => DispatchOutcome {
                success_count: messages.len(),
                failure_count: 0,
            },
            Err(err) => {
                warn!(error = %err, "batched push failed; falling back to sequential sends");
                self.send_sequentially(&messages).await
            }
        };

        // The durable records are the in-app history; they exist for
        // every intended recipient regardless of transport outcome.
        let now = Utc::now();
        for message in &messages {
            let record = Notification {
                id: Uuid::new_v4(),
                recipient_id: message.recipient_id,
                role: message.role,
                title: job.title.clone(),
                body: job.body.clone(),
                payload: payload.clone(),
                kind: job.kind,
                related_id: job.related_id,
                read: false,
                created_at: now,
            };
            state.notifications.insert(record.id, record);
        }

        state
            .metrics
            .notifications_sent_total
            .with_label_values(&["delivered"])
            .inc_by(outcome.success_count as u64);
        state
            .metrics
            .notifications_sent_total
            .with_label_values(&["failed"])
            .inc_by(outcome.failure_count as u64);

        outcome
    }

    async fn send_sequentially(&self, messages: &[PushMessage]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for message in messages {
            match self.send_with_retry(message).await {
                Ok(()) => outcome.success_count += 1,
                Err(err) => {
                    warn!(
                        recipient_id = %message.recipient_id,
                        error = %err,
                        "push send failed after retry"
                    );
                    outcome.failure_count += 1;
                }
            }
        }
        outcome
    }

    /// Exactly one retry after a fixed delay; after that the recipient
    /// counts as a permanent failure for this dispatch.
    async fn send_with_retry(&self, message: &PushMessage) -> Result<(), TransportError> {
        match self.transport.send(message).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(
                    recipient_id = %message.recipient_id,
                    error = %err,
                    "push send failed; retrying once"
                );
                sleep(self.retry_delay).await;
                self.transport.send(message).await
            }
        }
    }
}

/// Resolves the audience to concrete (recipient, role, token) triples.
/// Recipients without a push token are not intended recipients; an
/// empty result makes the dispatch a no-op.
fn resolve_recipients(state: &AppState, audience: &Audience) -> Vec<(Uuid, Role, String)> {
    match audience {
        Audience::Direct {
            recipient_id,
            role: Role::User,
        } => match state.users.get(recipient_id) {
            Some(user) => match &user.push_token {
                Some(token) => vec![(*recipient_id, Role::User, token.clone())],
                None => {
                    warn!(user_id = %recipient_id, "user has no push token");
                    Vec::new()
                }
            },
            None => {
                warn!(user_id = %recipient_id, "notification for unknown user");
                Vec::new()
            }
        },
        Audience::Direct {
            recipient_id,
            role: Role::Courier,
        } => match state.couriers.get(recipient_id) {
            Some(courier) => match &courier.push_token {
                Some(token) => vec![(*recipient_id, Role::Courier, token.clone())],
                None => {
                    warn!(courier_id = %recipient_id, "courier has no push token");
                    Vec::new()
                }
            },
            None => {
                warn!(courier_id = %recipient_id, "notification for unknown courier");
                Vec::new()
            }
        },
        Audience::EligibleCouriers => availability::list_eligible(state, None)
            .into_iter()
            .filter_map(|courier| {
                courier
                    .push_token
                    .clone()
                    .map(|token| (courier.id, Role::Courier, token))
            })
            .collect(),
    }
}
