use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::models::auth::AuthenticatedUser;

/// Extractor for the admin screens: a valid token with the `admin` role.
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err((StatusCode::FORBIDDEN, "Admin role required"));
        }
        Ok(AdminUser(user))
    }
}
