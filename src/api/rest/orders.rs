use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::lifecycle::{self, LifecycleError};
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::order::{Order, OrderStatus};
use crate::models::page::PageMeta;
use crate::state::AppState;

const NOTES_LEN: std::ops::RangeInclusive<usize> = 3..=500;
const ADDRESS_LEN: std::ops::RangeInclusive<usize> = 1..=255;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/pending", get(list_pending_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/claim", post(claim_order))
        .route("/orders/:id/complete", post(complete_order))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub notes: String,
    pub address: String,
}

#[derive(Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

#[derive(Deserialize)]
pub struct PendingListQuery {
    #[serde(default = "default_pending_limit")]
    pub limit: usize,
    #[serde(default)]
    pub skip: usize,
}

fn default_limit() -> usize {
    10
}

fn default_pending_limit() -> usize {
    20
}

#[derive(Serialize)]
struct OrderListResponse {
    orders: Vec<Order>,
    metadata: PageMeta,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    if actor.role != Role::User {
        return Err(AppError::Forbidden(
            "only users can create orders".to_string(),
        ));
    }

    if !NOTES_LEN.contains(&payload.notes.chars().count()) {
        return Err(AppError::BadRequest(
            "notes must be between 3 and 500 characters".to_string(),
        ));
    }

    if !ADDRESS_LEN.contains(&payload.address.chars().count()) {
        return Err(AppError::BadRequest(
            "address must be between 1 and 255 characters".to_string(),
        ));
    }

    let order = lifecycle::create_order(&state, actor.id, payload.notes, payload.address)
        .await
        .map_err(|_| AppError::BadRequest("could not create order".to_string()))?;

    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<OrderListQuery>,
) -> Json<OrderListResponse> {
    let page = match actor.role {
        Role::User => {
            lifecycle::list_user_orders(&state, actor.id, query.status, query.limit, query.skip)
        }
        Role::Courier => {
            lifecycle::list_courier_orders(&state, actor.id, query.status, query.limit, query.skip)
        }
    };

    Json(OrderListResponse {
        orders: page.items,
        metadata: page.meta,
    })
}

async fn list_pending_orders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<PendingListQuery>,
) -> Result<Json<OrderListResponse>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Forbidden(
            "only couriers can browse pending orders".to_string(),
        ));
    }

    let page = lifecycle::list_pending_orders(&state, query.limit, query.skip);
    Ok(Json(OrderListResponse {
        orders: page.items,
        metadata: page.meta,
    }))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = lifecycle::get_order(&state, id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    // Owner user, assigned courier, or any courier while still pending.
    let allowed = match actor.role {
        Role::User => order.user_id == actor.id,
        Role::Courier => {
            order.status == OrderStatus::Pending || order.courier_id == Some(actor.id)
        }
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "you do not have access to this order".to_string(),
        ));
    }

    Ok(Json(order))
}

async fn claim_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Forbidden(
            "only couriers can claim orders".to_string(),
        ));
    }

    let order = lifecycle::claim_order(&state, id, actor.id)
        .await
        .map_err(|err| match err {
            LifecycleError::NotFound => AppError::NotFound(format!("order {id} not found")),
            LifecycleError::Conflict => {
                AppError::BadRequest("order is no longer available".to_string())
            }
        })?;

    Ok(Json(order))
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Forbidden(
            "only couriers can complete orders".to_string(),
        ));
    }

    let order = lifecycle::complete_order(&state, id, actor.id)
        .await
        .map_err(|err| match err {
            LifecycleError::NotFound => AppError::NotFound(format!("order {id} not found")),
            LifecycleError::Conflict => {
                AppError::BadRequest("order cannot be completed".to_string())
            }
        })?;

    Ok(Json(order))
}
