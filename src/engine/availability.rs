use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::courier::Courier;
use crate::state::AppState;

/// Couriers able to take new orders right now, least-loaded first. The
/// ordering only shapes read order; broadcast targets the whole set.
pub fn list_eligible(state: &AppState, limit: Option<usize>) -> Vec<Courier> {
    let mut eligible: Vec<Courier> = state
        .couriers
        .iter()
        .filter(|entry| entry.value().is_eligible())
        .map(|entry| entry.value().clone())
        .collect();

    eligible.sort_by_key(|courier| courier.current_orders_count);

    if let Some(limit) = limit {
        eligible.truncate(limit);
    }

    eligible
}

/// Idempotent single-field availability update. Reports whether a write
/// occurred; an unknown courier is logged as a warning, not escalated.
pub fn set_availability(state: &AppState, courier_id: Uuid, available: bool) -> bool {
    match state.couriers.get_mut(&courier_id) {
        Some(mut courier) => {
            courier.available = available;
            courier.updated_at = Utc::now();
            info!(courier_id = %courier_id, available, "courier availability updated");
            true
        }
        None => {
            warn!(courier_id = %courier_id, "availability update for unknown courier");
            false
        }
    }
}

/// Registers a won claim against the courier record: one more order in
/// flight, no longer available for broadcasts.
pub fn mark_assigned(state: &AppState, courier_id: Uuid) -> bool {
    match state.couriers.get_mut(&courier_id) {
        Some(mut courier) => {
            courier.current_orders_count += 1;
            courier.available = false;
            courier.updated_at = Utc::now();
            true
        }
        None => {
            warn!(courier_id = %courier_id, "claim recorded for unknown courier");
            false
        }
    }
}

/// Registers a completed delivery: load goes down, the completed total
/// goes up, and the courier becomes available again once nothing is in
/// flight.
pub fn mark_completed(state: &AppState, courier_id: Uuid) -> bool {
    match state.couriers.get_mut(&courier_id) {
        Some(mut courier) => {
            courier.current_orders_count = courier.current_orders_count.saturating_sub(1);
            courier.total_orders_completed += 1;
            if courier.current_orders_count == 0 {
                courier.available = true;
            }
            courier.updated_at = Utc::now();
            true
        }
        None => {
            warn!(courier_id = %courier_id, "completion recorded for unknown courier");
            false
        }
    }
}
