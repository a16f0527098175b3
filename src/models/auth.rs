use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRole;

/// Claims embedded in the access token issued by the auth backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // profile UUID
    pub role: UserRole,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
}

/// Extracted from the validated JWT: available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_parent(&self) -> bool {
        matches!(self.role, UserRole::Parent | UserRole::Admin)
    }
}
