use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::availability;
use crate::models::notification::NotificationKind;
use crate::models::order::{Order, OrderStatus};
use crate::models::page::{Page, paginate};
use crate::notify::NotificationJob;
use crate::state::AppState;

/// Typed failure signal for lifecycle mutators. `NotFound` means no such
/// order (or prerequisite record); `Conflict` means the order exists but
/// its state no longer satisfies the transition's precondition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("not found")]
    NotFound,
    #[error("state precondition failed")]
    Conflict,
}

/// Creates a PENDING order for an active user, freezing the user's
/// contact info into the order, then broadcasts to eligible couriers.
/// The broadcast is best effort; the order stands even if it never goes
/// out.
pub async fn create_order(
    state: &AppState,
    user_id: Uuid,
    notes: String,
    address: String,
) -> Result<Order, LifecycleError> {
    let user_info = match state.users.get(&user_id) {
        Some(user) if user.active => user.contact_snapshot(),
        Some(_) => {
            warn!(user_id = %user_id, "order creation for inactive user");
            return Err(LifecycleError::NotFound);
        }
        None => {
            warn!(user_id = %user_id, "order creation for unknown user");
            return Err(LifecycleError::NotFound);
        }
    };

    let order = Order::new(user_id, notes, address, user_info);
    state.orders.insert(order.id, order.clone());
    state.metrics.orders_pending.inc();

    info!(order_id = %order.id, user_id = %user_id, "order created");

    let job = NotificationJob::courier_broadcast(
        "New order available",
        format!("{} placed a new order", order.user_info.name),
        NotificationKind::NewOrder,
        order.id,
    )
    .with_payload("order_id", order.id.to_string());
    enqueue_notification(state, job).await;

    Ok(order)
}

/// Atomically transitions PENDING -> PROCESSING for exactly one claimant.
/// The precondition check and the write happen under a single entry
/// guard, so concurrent claims serialize and losers observe a changed
/// status.
pub async fn claim_order(
    state: &AppState,
    order_id: Uuid,
    courier_id: Uuid,
) -> Result<Order, LifecycleError> {
    let courier_info = {
        let courier = state
            .couriers
            .get(&courier_id)
            .ok_or(LifecycleError::NotFound)?;
        if !courier.active {
            warn!(courier_id = %courier_id, "claim attempt by inactive courier");
            return Err(LifecycleError::Conflict);
        }
        courier.contact_snapshot()
    };

    let claimed = {
        let mut entry = match state.orders.get_mut(&order_id) {
            Some(entry) => entry,
            None => {
                state
                    .metrics
                    .claims_total
                    .with_label_values(&["not_found"])
                    .inc();
                return Err(LifecycleError::NotFound);
            }
        };
        let order = entry.value_mut();
        if order.status != OrderStatus::Pending {
            state
                .metrics
                .claims_total
                .with_label_values(&["conflict"])
                .inc();
            warn!(order_id = %order_id, courier_id = %courier_id, "order no longer claimable");
            return Err(LifecycleError::Conflict);
        }

        let now = Utc::now();
        order.status = OrderStatus::Processing;
        order.courier_id = Some(courier_id);
        order.courier_info = Some(courier_info);
        order.assigned_at = Some(now);
        order.updated_at = now;
        order.clone()
    };

    state.metrics.orders_pending.dec();
    state.metrics.claims_total.with_label_values(&["won"]).inc();

    // A courier record lagging the order here is accepted; complete()
    // brings it back in line.
    availability::mark_assigned(state, courier_id);

    info!(order_id = %order_id, courier_id = %courier_id, "order claimed");

    let courier_name = claimed
        .courier_info
        .as_ref()
        .map(|info| info.name.clone())
        .unwrap_or_else(|| "A courier".to_string());
    let job = NotificationJob::to_user(
        claimed.user_id,
        "Your order is being processed",
        format!("{courier_name} took your order and is on the way"),
        NotificationKind::OrderAssigned,
        order_id,
    )
    .with_payload("order_id", order_id.to_string())
    .with_payload("courier_name", courier_name);
    enqueue_notification(state, job).await;

    Ok(claimed)
}

/// Atomically transitions PROCESSING -> COMPLETED. Only the assigned
/// courier may complete; the combined (status, courier) check-and-set
/// runs under one entry guard. Completing an already-completed order is
/// a no-op conflict that never touches completed_at.
pub async fn complete_order(
    state: &AppState,
    order_id: Uuid,
    courier_id: Uuid,
) -> Result<Order, LifecycleError> {
    let completed = {
        let mut entry = state
            .orders
            .get_mut(&order_id)
            .ok_or(LifecycleError::NotFound)?;
        let order = entry.value_mut();
        if order.status != OrderStatus::Processing || order.courier_id != Some(courier_id) {
            warn!(order_id = %order_id, courier_id = %courier_id, "order not completable by this courier");
            return Err(LifecycleError::Conflict);
        }

        let now = Utc::now();
        order.status = OrderStatus::Completed;
        order.completed_at = Some(now);
        order.updated_at = now;
        order.clone()
    };

    availability::mark_completed(state, courier_id);

    info!(order_id = %order_id, courier_id = %courier_id, "order completed");

    let courier_name = completed
        .courier_info
        .as_ref()
        .map(|info| info.name.clone())
        .unwrap_or_else(|| "The courier".to_string());
    let job = NotificationJob::to_user(
        completed.user_id,
        "Order completed",
        format!("{courier_name} delivered your order"),
        NotificationKind::OrderCompleted,
        order_id,
    )
    .with_payload("order_id", order_id.to_string());
    enqueue_notification(state, job).await;

    Ok(completed)
}

pub fn get_order(state: &AppState, order_id: Uuid) -> Option<Order> {
    state.orders.get(&order_id).map(|entry| entry.value().clone())
}

/// A user's own orders, newest first, optionally filtered by status.
pub fn list_user_orders(
    state: &AppState,
    user_id: Uuid,
    status: Option<OrderStatus>,
    limit: usize,
    skip: usize,
) -> Page<Order> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.value().user_id == user_id)
        .filter(|entry| status.is_none_or(|wanted| entry.value().status == wanted))
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    paginate(orders, limit, skip)
}

/// A courier's orders, newest first. A courier never owns a pending
/// order, so a pending filter is ignored rather than honored.
pub fn list_courier_orders(
    state: &AppState,
    courier_id: Uuid,
    status: Option<OrderStatus>,
    limit: usize,
    skip: usize,
) -> Page<Order> {
    let status = status.filter(|wanted| *wanted != OrderStatus::Pending);
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.value().courier_id == Some(courier_id))
        .filter(|entry| status.is_none_or(|wanted| entry.value().status == wanted))
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    paginate(orders, limit, skip)
}

/// Pending orders for couriers to browse, oldest first so long-waiting
/// orders surface at the top.
pub fn list_pending_orders(state: &AppState, limit: usize, skip: usize) -> Page<Order> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.value().status == OrderStatus::Pending)
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    paginate(orders, limit, skip)
}

/// Post-commit hand-off to the dispatch worker. Best effort: the state
/// transition stands regardless of whether the job can be queued.
async fn enqueue_notification(state: &AppState, job: NotificationJob) {
    if let Err(err) = state.outbox_tx.send(job).await {
        error!(error = %err, "failed to enqueue notification job");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Barrier;
    use uuid::Uuid;

    use super::{
        LifecycleError, claim_order, complete_order, create_order, get_order, list_courier_orders,
        list_pending_orders, list_user_orders,
    };
    use crate::models::courier::Courier;
    use crate::models::order::OrderStatus;
    use crate::models::user::User;
    use crate::state::AppState;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(64, 16).0)
    }

    fn seed_user(state: &AppState) -> Uuid {
        let user = User::new(
            "Ada".to_string(),
            "555-0101".to_string(),
            "ada@example.com".to_string(),
            Some("user-token".to_string()),
        );
        let id = user.id;
        state.users.insert(id, user);
        id
    }

    fn seed_courier(state: &AppState, name: &str) -> Uuid {
        let courier = Courier::new(
            name.to_string(),
            "555-0102".to_string(),
            format!("{name}@example.com"),
            Some(format!("token-{name}")),
        );
        let id = courier.id;
        state.couriers.insert(id, courier);
        id
    }

    async fn pending_order(state: &AppState, user_id: Uuid) -> Uuid {
        create_order(
            state,
            user_id,
            "Pizza, no onions".to_string(),
            "123 Main St".to_string(),
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn create_requires_a_known_active_user() {
        let state = state();
        let err = create_order(
            &state,
            Uuid::new_v4(),
            "Pizza".to_string(),
            "123 Main St".to_string(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, LifecycleError::NotFound);

        let user_id = seed_user(&state);
        state.users.get_mut(&user_id).unwrap().active = false;
        let err = create_order(
            &state,
            user_id,
            "Pizza".to_string(),
            "123 Main St".to_string(),
        )
        .await
        .unwrap_err();
        assert_eq!(err, LifecycleError::NotFound);
    }

    #[tokio::test]
    async fn create_starts_pending_with_a_user_snapshot() {
        let state = state();
        let user_id = seed_user(&state);

        let order = create_order(
            &state,
            user_id,
            "Pizza, no onions".to_string(),
            "123 Main St".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.courier_id.is_none());
        assert!(order.courier_info.is_none());
        assert!(order.assigned_at.is_none());
        assert!(order.completed_at.is_none());
        assert_eq!(order.user_info.name, "Ada");
        assert_eq!(order.created_at, order.updated_at);
    }

    #[tokio::test]
    async fn snapshot_is_frozen_at_creation() {
        let state = state();
        let user_id = seed_user(&state);
        let order_id = pending_order(&state, user_id).await;

        state.users.get_mut(&user_id).unwrap().name = "Renamed".to_string();

        let order = get_order(&state, order_id).unwrap();
        assert_eq!(order.user_info.name, "Ada");
    }

    #[tokio::test]
    async fn claim_moves_pending_to_processing() {
        let state = state();
        let user_id = seed_user(&state);
        let courier_id = seed_courier(&state, "carl");
        let order_id = pending_order(&state, user_id).await;

        let order = claim_order(&state, order_id, courier_id).await.unwrap();

        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.courier_id, Some(courier_id));
        assert_eq!(order.courier_info.as_ref().unwrap().name, "carl");
        let assigned_at = order.assigned_at.unwrap();
        assert!(order.created_at <= assigned_at);
        assert_eq!(order.updated_at, assigned_at);

        let courier = state.couriers.get(&courier_id).unwrap();
        assert!(!courier.available);
        assert_eq!(courier.current_orders_count, 1);
    }

    #[tokio::test]
    async fn claim_on_missing_order_is_not_found() {
        let state = state();
        let courier_id = seed_courier(&state, "carl");
        let err = claim_order(&state, Uuid::new_v4(), courier_id)
            .await
            .unwrap_err();
        assert_eq!(err, LifecycleError::NotFound);
    }

    #[tokio::test]
    async fn second_claim_is_a_conflict() {
        let state = state();
        let user_id = seed_user(&state);
        let winner = seed_courier(&state, "winner");
        let loser = seed_courier(&state, "loser");
        let order_id = pending_order(&state, user_id).await;

        claim_order(&state, order_id, winner).await.unwrap();
        let err = claim_order(&state, order_id, loser).await.unwrap_err();

        assert_eq!(err, LifecycleError::Conflict);
        let order = get_order(&state, order_id).unwrap();
        assert_eq!(order.courier_id, Some(winner));
    }

    #[tokio::test]
    async fn inactive_courier_cannot_claim() {
        let state = state();
        let user_id = seed_user(&state);
        let courier_id = seed_courier(&state, "ghost");
        state.couriers.get_mut(&courier_id).unwrap().active = false;
        let order_id = pending_order(&state, user_id).await;

        let err = claim_order(&state, order_id, courier_id).await.unwrap_err();
        assert_eq!(err, LifecycleError::Conflict);
        assert_eq!(
            get_order(&state, order_id).unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_exactly_one_winner() {
        let state = state();
        let user_id = seed_user(&state);
        let order_id = pending_order(&state, user_id).await;

        let couriers: Vec<Uuid> = (0..8)
            .map(|i| seed_courier(&state, &format!("racer-{i}")))
            .collect();

        let barrier = Arc::new(Barrier::new(couriers.len()));
        let mut handles = Vec::new();
        for courier_id in &couriers {
            let state = state.clone();
            let barrier = barrier.clone();
            let courier_id = *courier_id;
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                claim_order(&state, order_id, courier_id).await
            }));
        }

        let mut winners = Vec::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(order) => winners.push(order.courier_id.unwrap()),
                Err(LifecycleError::Conflict) => conflicts += 1,
                Err(other) => panic!("unexpected claim error: {other}"),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(conflicts, couriers.len() - 1);
        let order = get_order(&state, order_id).unwrap();
        assert_eq!(order.courier_id, Some(winners[0]));
        assert_eq!(order.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn complete_finishes_the_order_and_frees_the_courier() {
        let state = state();
        let user_id = seed_user(&state);
        let courier_id = seed_courier(&state, "carl");
        let order_id = pending_order(&state, user_id).await;
        claim_order(&state, order_id, courier_id).await.unwrap();

        let order = complete_order(&state, order_id, courier_id).await.unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        let completed_at = order.completed_at.unwrap();
        assert!(order.assigned_at.unwrap() <= completed_at);
        assert_eq!(order.updated_at, completed_at);

        let courier = state.couriers.get(&courier_id).unwrap();
        assert!(courier.available);
        assert_eq!(courier.current_orders_count, 0);
        assert_eq!(courier.total_orders_completed, 1);
    }

    #[tokio::test]
    async fn only_the_assigned_courier_may_complete() {
        let state = state();
        let user_id = seed_user(&state);
        let assigned = seed_courier(&state, "assigned");
        let other = seed_courier(&state, "other");
        let order_id = pending_order(&state, user_id).await;
        claim_order(&state, order_id, assigned).await.unwrap();

        let err = complete_order(&state, order_id, other).await.unwrap_err();
        assert_eq!(err, LifecycleError::Conflict);

        let order = get_order(&state, order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.completed_at.is_none());
    }

    #[tokio::test]
    async fn completing_twice_never_moves_completed_at() {
        let state = state();
        let user_id = seed_user(&state);
        let courier_id = seed_courier(&state, "carl");
        let order_id = pending_order(&state, user_id).await;
        claim_order(&state, order_id, courier_id).await.unwrap();

        let first = complete_order(&state, order_id, courier_id).await.unwrap();
        let err = complete_order(&state, order_id, courier_id)
            .await
            .unwrap_err();

        assert_eq!(err, LifecycleError::Conflict);
        let order = get_order(&state, order_id).unwrap();
        assert_eq!(order.completed_at, first.completed_at);
    }

    #[tokio::test]
    async fn pending_cannot_jump_straight_to_completed() {
        let state = state();
        let user_id = seed_user(&state);
        let courier_id = seed_courier(&state, "carl");
        let order_id = pending_order(&state, user_id).await;

        let err = complete_order(&state, order_id, courier_id)
            .await
            .unwrap_err();
        assert_eq!(err, LifecycleError::Conflict);
        assert_eq!(
            get_order(&state, order_id).unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn listings_filter_sort_and_paginate() {
        let state = state();
        let user_id = seed_user(&state);
        let courier_id = seed_courier(&state, "carl");

        let mut order_ids = Vec::new();
        for _ in 0..3 {
            order_ids.push(pending_order(&state, user_id).await);
        }
        claim_order(&state, order_ids[0], courier_id).await.unwrap();
        complete_order(&state, order_ids[0], courier_id)
            .await
            .unwrap();

        let mine = list_user_orders(&state, user_id, None, 10, 0);
        assert_eq!(mine.meta.total, 3);
        // Newest first for the user view.
        assert_eq!(mine.items[2].id, order_ids[0]);

        let completed = list_user_orders(&state, user_id, Some(OrderStatus::Completed), 10, 0);
        assert_eq!(completed.meta.total, 1);

        let pending = list_pending_orders(&state, 10, 0);
        assert_eq!(pending.meta.total, 2);
        // Oldest first for the pending queue.
        assert_eq!(pending.items[0].id, order_ids[1]);

        let theirs = list_courier_orders(&state, courier_id, None, 10, 0);
        assert_eq!(theirs.meta.total, 1);

        // A pending filter makes no sense for couriers and is ignored.
        let ignored = list_courier_orders(&state, courier_id, Some(OrderStatus::Pending), 10, 0);
        assert_eq!(ignored.meta.total, 1);

        let page = list_user_orders(&state, user_id, None, 2, 2);
        assert_eq!(page.items.len(), 1);
        assert!(!page.meta.has_more);
    }
}
