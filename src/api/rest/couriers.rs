use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::{patch, post};
use serde::Deserialize;

use crate::engine::availability;
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::courier::Courier;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(register_courier).get(list_couriers))
        .route("/couriers/availability", patch(update_availability))
}

#[derive(Deserialize)]
pub struct RegisterCourierRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub push_token: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available: bool,
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.email.trim().is_empty() {
        return Err(AppError::BadRequest("email cannot be empty".to_string()));
    }

    let courier = Courier::new(
        payload.name,
        payload.phone,
        payload.email,
        payload.push_token,
    );
    state.couriers.insert(courier.id, courier.clone());
    Ok(Json(courier))
}

async fn list_couriers(State(state): State<Arc<AppState>>) -> Json<Vec<Courier>> {
    let couriers = state
        .couriers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Json(couriers)
}

/// A courier toggling their own availability. Assignment and completion
/// also move this flag; this endpoint only covers the manual case.
async fn update_availability(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Courier>, AppError> {
    if actor.role != Role::Courier {
        return Err(AppError::Forbidden(
            "only couriers can update availability".to_string(),
        ));
    }

    if !availability::set_availability(&state, actor.id, payload.available) {
        return Err(AppError::NotFound("courier not found".to_string()));
    }

    let courier = state
        .couriers
        .get(&actor.id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("courier not found".to_string()))?;
    Ok(Json(courier))
}
