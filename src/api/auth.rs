//! Request authentication.
//!
//! Sessions are issued elsewhere; this service only resolves
//! `Authorization: Bearer <token>` against `users.session_token`.

use super::AppState;
use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

/// The signed-in user. Rejects with 401 when the token is missing or unknown.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

/// A signed-in admin. Rejects with 401 without a session and 403 for non-admins.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts).ok_or(Error::Unauthorized)?;
        let user = User::find()
            .filter(user::Column::SessionToken.eq(token))
            .one(&state.db)
            .await?
            .ok_or(Error::Unauthorized)?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(Error::forbidden("Admin access required"));
        }
        Ok(Self(user))
    }
}
