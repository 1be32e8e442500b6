//! Request extractors for authenticated users

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::db::{Role, UserRepository};
use crate::error::AppError;
use crate::state::AppState;

/// The caller behind a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner of a resource, or an admin
    pub fn can_modify(&self, owner_id: &str) -> bool {
        self.id == owner_id || self.is_admin()
    }
}

/// An authenticated caller with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Pull the token out of `Authorization: Bearer <token>`
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Access token required".to_string()))?;

    let value = value.to_str().map_err(|_| AppError::InvalidToken)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AppError::Unauthorized("Access token required".to_string())),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = bearer_token(parts)?;
        let claims = state.tokens().verify(token)?;

        // Role comes from the database so demotions apply immediately
        let user = UserRepository::new(state.db())
            .get(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(AuthUser {
            role: Role::parse(&user.role).unwrap_or(Role::User),
            id: user.id,
            username: user.username,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
