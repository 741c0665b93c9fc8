use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Courier,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Role::User),
            "courier" => Some(Role::Courier),
            _ => None,
        }
    }
}

/// The already-authenticated caller of a request. Identity resolution
/// happens upstream; handlers receive this and thread it through
/// explicitly instead of consulting ambient request state.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}
