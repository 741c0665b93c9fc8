use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::history::{self, CompletedOrderView, DateRange, HistoryStats};
use crate::models::actor::{Actor, Role};
use crate::models::page::PageMeta;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/history", get(my_history))
        .route("/history/:order_id", get(order_details))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Serialize)]
struct HistoryResponse {
    orders: Vec<CompletedOrderView>,
    metadata: PageMeta,
    statistics: HistoryStats,
}

async fn my_history(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let range = DateRange {
        start: query.start_date,
        end: query.end_date,
    };

    let result = match actor.role {
        Role::User => history::user_history(&state, actor.id, range, query.limit, query.skip),
        Role::Courier => history::courier_history(&state, actor.id, range, query.limit, query.skip),
    };

    Json(HistoryResponse {
        orders: result.page.items,
        metadata: result.page.meta,
        statistics: result.stats,
    })
}

async fn order_details(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(order_id): Path<Uuid>,
) -> Result<Json<CompletedOrderView>, AppError> {
    history::order_details(&state, order_id, actor)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found in history")))
}
