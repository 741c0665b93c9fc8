use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::actor::{Actor, Role};
use crate::models::order::{Order, OrderStatus};
use crate::models::page::{Page, paginate};
use crate::state::AppState;

/// Inclusive calendar-date window on completion time; the end date
/// covers its whole day.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if at < start.and_time(NaiveTime::MIN).and_utc() {
                return false;
            }
        }
        if let Some(end) = self.end {
            let end_exclusive = (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
            if at >= end_exclusive {
                return false;
            }
        }
        true
    }
}

/// A completed order annotated with its lifecycle latencies.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedOrderView {
    #[serde(flatten)]
    pub order: Order,
    pub assignment_duration_minutes: Option<f64>,
    pub delivery_duration_minutes: Option<f64>,
    pub total_duration_minutes: Option<f64>,
}

impl CompletedOrderView {
    fn from_order(order: Order) -> Self {
        let assignment_duration_minutes = order
            .assigned_at
            .map(|at| minutes_between(order.created_at, at));
        let delivery_duration_minutes = order
            .assigned_at
            .zip(order.completed_at)
            .map(|(assigned, completed)| minutes_between(assigned, completed));
        let total_duration_minutes = order
            .completed_at
            .map(|at| minutes_between(order.created_at, at));
        Self {
            order,
            assignment_duration_minutes,
            delivery_duration_minutes,
            total_duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct HistoryStats {
    pub total_orders: usize,
    pub avg_duration_minutes: f64,
    pub min_duration_minutes: f64,
    pub max_duration_minutes: f64,
}

pub struct History {
    pub page: Page<CompletedOrderView>,
    pub stats: HistoryStats,
}

pub fn user_history(
    state: &AppState,
    user_id: Uuid,
    range: DateRange,
    limit: usize,
    skip: usize,
) -> History {
    history_for(state, |order| order.user_id == user_id, range, limit, skip)
}

pub fn courier_history(
    state: &AppState,
    courier_id: Uuid,
    range: DateRange,
    limit: usize,
    skip: usize,
) -> History {
    history_for(
        state,
        |order| order.courier_id == Some(courier_id),
        range,
        limit,
        skip,
    )
}

/// One completed order with latency metrics, visible only to the owning
/// user or the courier who delivered it.
pub fn order_details(state: &AppState, order_id: Uuid, actor: Actor) -> Option<CompletedOrderView> {
    let order = state.orders.get(&order_id)?.value().clone();
    if order.status != OrderStatus::Completed {
        return None;
    }
    let allowed = match actor.role {
        Role::User => order.user_id == actor.id,
        Role::Courier => order.courier_id == Some(actor.id),
    };
    if !allowed {
        return None;
    }
    Some(CompletedOrderView::from_order(order))
}

fn history_for(
    state: &AppState,
    matches: impl Fn(&Order) -> bool,
    range: DateRange,
    limit: usize,
    skip: usize,
) -> History {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.value().status == OrderStatus::Completed)
        .filter(|entry| matches(entry.value()))
        .filter(|entry| {
            entry
                .value()
                .completed_at
                .is_some_and(|at| range.contains(at))
        })
        .map(|entry| entry.value().clone())
        .collect();
    orders.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let stats = compute_stats(&orders);
    let views = orders.into_iter().map(CompletedOrderView::from_order).collect();
    History {
        page: paginate(views, limit, skip),
        stats,
    }
}

/// Aggregates over the full match set, not just the returned page.
fn compute_stats(orders: &[Order]) -> HistoryStats {
    let durations: Vec<f64> = orders
        .iter()
        .filter_map(|order| {
            order
                .completed_at
                .map(|at| minutes_between(order.created_at, at))
        })
        .collect();

    if durations.is_empty() {
        return HistoryStats {
            total_orders: 0,
            avg_duration_minutes: 0.0,
            min_duration_minutes: 0.0,
            max_duration_minutes: 0.0,
        };
    }

    let sum: f64 = durations.iter().sum();
    let min = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let max = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    HistoryStats {
        total_orders: durations.len(),
        avg_duration_minutes: round2(sum / durations.len() as f64),
        min_duration_minutes: round2(min),
        max_duration_minutes: round2(max),
    }
}

/// Minutes between two instants, rounded to two decimal places.
fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    round2((to - from).num_milliseconds() as f64 / 60_000.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    use super::{DateRange, courier_history, order_details, user_history};
    use crate::models::actor::{Actor, Role};
    use crate::models::order::{ContactSnapshot, Order, OrderStatus};
    use crate::state::AppState;

    fn state() -> AppState {
        AppState::new(16, 16).0
    }

    fn snapshot(name: &str) -> ContactSnapshot {
        ContactSnapshot {
            name: name.to_string(),
            phone: "555-0100".to_string(),
            email: format!("{name}@example.com"),
        }
    }

    fn completed_order(
        state: &AppState,
        user_id: Uuid,
        courier_id: Uuid,
        created_minute: i64,
        assigned_offset: i64,
        completed_offset: i64,
    ) -> Uuid {
        let created = Utc
            .with_ymd_and_hms(2024, 3, 10, 12, 0, 0)
            .unwrap()
            + Duration::minutes(created_minute);
        let assigned = created + Duration::minutes(assigned_offset);
        let completed = created + Duration::minutes(completed_offset);
        let order = Order {
            id: Uuid::new_v4(),
            user_id,
            notes: "Pizza, no onions".to_string(),
            address: "123 Main St".to_string(),
            user_info: snapshot("ada"),
            status: OrderStatus::Completed,
            courier_id: Some(courier_id),
            courier_info: Some(snapshot("carl")),
            created_at: created,
            updated_at: completed,
            assigned_at: Some(assigned),
            completed_at: Some(completed),
        };
        let id = order.id;
        state.orders.insert(id, order);
        id
    }

    #[test]
    fn duration_fixture_computes_expected_minutes() {
        let state = state();
        let user_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();
        completed_order(&state, user_id, courier_id, 0, 5, 20);

        let history = user_history(&state, user_id, DateRange::default(), 10, 0);
        assert_eq!(history.page.meta.total, 1);
        let view = &history.page.items[0];
        assert_eq!(view.assignment_duration_minutes, Some(5.00));
        assert_eq!(view.delivery_duration_minutes, Some(15.00));
        assert_eq!(view.total_duration_minutes, Some(20.00));
        assert_eq!(history.stats.avg_duration_minutes, 20.00);
    }

    #[test]
    fn only_completed_orders_appear() {
        let state = state();
        let user_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();
        completed_order(&state, user_id, courier_id, 0, 5, 20);

        let pending = Order::new(
            user_id,
            "Sushi".to_string(),
            "9 Side St".to_string(),
            snapshot("ada"),
        );
        state.orders.insert(pending.id, pending);

        let history = user_history(&state, user_id, DateRange::default(), 10, 0);
        assert_eq!(history.page.meta.total, 1);
        assert_eq!(history.stats.total_orders, 1);
    }

    #[test]
    fn date_range_is_inclusive_through_end_of_day() {
        let state = state();
        let user_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();
        // Completed 2024-03-10 12:20 UTC.
        completed_order(&state, user_id, courier_id, 0, 5, 20);

        let on_day = DateRange {
            start: Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
            end: Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()),
        };
        assert_eq!(user_history(&state, user_id, on_day, 10, 0).page.meta.total, 1);

        let before = DateRange {
            start: None,
            end: Some(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
        };
        assert_eq!(user_history(&state, user_id, before, 10, 0).page.meta.total, 0);

        let after = DateRange {
            start: Some(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()),
            end: None,
        };
        assert_eq!(user_history(&state, user_id, after, 10, 0).page.meta.total, 0);
    }

    #[test]
    fn stats_cover_the_full_match_set_not_the_page() {
        let state = state();
        let user_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();
        completed_order(&state, user_id, courier_id, 0, 5, 10);
        completed_order(&state, user_id, courier_id, 60, 5, 20);
        completed_order(&state, user_id, courier_id, 120, 5, 30);

        let history = user_history(&state, user_id, DateRange::default(), 1, 0);
        assert_eq!(history.page.items.len(), 1);
        assert!(history.page.meta.has_more);
        assert_eq!(history.stats.total_orders, 3);
        assert_eq!(history.stats.min_duration_minutes, 10.00);
        assert_eq!(history.stats.max_duration_minutes, 30.00);
        assert_eq!(history.stats.avg_duration_minutes, 20.00);
    }

    #[test]
    fn courier_history_newest_completion_first() {
        let state = state();
        let user_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();
        completed_order(&state, user_id, courier_id, 0, 5, 10);
        let late = completed_order(&state, user_id, courier_id, 60, 5, 20);

        let history = courier_history(&state, courier_id, DateRange::default(), 10, 0);
        assert_eq!(history.page.items[0].order.id, late);
    }

    #[test]
    fn order_details_enforces_participant_access() {
        let state = state();
        let user_id = Uuid::new_v4();
        let courier_id = Uuid::new_v4();
        let order_id = completed_order(&state, user_id, courier_id, 0, 5, 20);

        let owner = Actor {
            id: user_id,
            role: Role::User,
        };
        let assigned = Actor {
            id: courier_id,
            role: Role::Courier,
        };
        let stranger = Actor {
            id: Uuid::new_v4(),
            role: Role::Courier,
        };

        assert!(order_details(&state, order_id, owner).is_some());
        assert!(order_details(&state, order_id, assigned).is_some());
        assert!(order_details(&state, order_id, stranger).is_none());
    }
}
