use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::post;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::user::User;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/users", post(register_user))
}

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub push_token: Option<String>,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<User>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.email.trim().is_empty() {
        return Err(AppError::BadRequest("email cannot be empty".to_string()));
    }

    let user = User::new(
        payload.name,
        payload.phone,
        payload.email,
        payload.push_token,
    );
    state.users.insert(user.id, user.clone());
    Ok(Json(user))
}
