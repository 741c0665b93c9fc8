use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::notify::NotificationJob;
use crate::notify::dispatcher::Dispatcher;
use crate::state::AppState;

/// Outbox consumer: drains dispatch jobs enqueued by the lifecycle
/// engine after each committed transition. Runs for the lifetime of the
/// process; dispatch outcomes are logged and counted, never propagated.
pub async fn run_dispatch_worker(
    state: Arc<AppState>,
    mut outbox_rx: mpsc::Receiver<NotificationJob>,
    dispatcher: Dispatcher,
) {
    info!("notification dispatch worker started");

    while let Some(job) = outbox_rx.recv().await {
        let start = Instant::now();
        let outcome = dispatcher.dispatch(&state, &job).await;
        let elapsed = start.elapsed().as_secs_f64();

        let label = if outcome.failure_count == 0 {
            "success"
        } else {
            "partial"
        };
        state
            .metrics
            .dispatch_latency_seconds
            .with_label_values(&[label])
            .observe(elapsed);

        info!(
            kind = ?job.kind,
            success_count = outcome.success_count,
            failure_count = outcome.failure_count,
            "notification dispatch finished"
        );
    }

    warn!("notification dispatch worker stopped: outbox channel closed");
}
