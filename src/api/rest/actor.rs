use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};

const ACTOR_ID_HEADER: &str = "x-actor-id";
const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extracts the authenticated actor from the identity headers set by the
/// upstream auth layer. Credential verification lives outside this
/// service; these headers are trusted input here.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw_id = header_value(parts, ACTOR_ID_HEADER)?;
        let id = Uuid::parse_str(raw_id)
            .map_err(|_| AppError::Unauthorized("invalid actor id".to_string()))?;

        let raw_role = header_value(parts, ACTOR_ROLE_HEADER)?;
        let role = Role::parse(raw_role)
            .ok_or_else(|| AppError::Unauthorized("unknown actor role".to_string()))?;

        Ok(Actor { id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))
}
