//! Registration and login endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

use cart::CartStore;
use catalog::CatalogStore;

use crate::AppState;
use crate::auth::{Role, User};
use crate::error::ApiError;
use crate::routes::caller_session;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

// -- Handlers --

/// POST /auth/register — create an account.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password cannot be empty".to_string()));
    }
    let user = state
        .auth
        .register(&req.name, &req.email, &req.password, req.role)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/login — verify credentials.
///
/// When an `X-Session-Id` header accompanies the request, the anonymous
/// session's cart is folded into the user's cart.
#[tracing::instrument(skip(state, headers, req))]
pub async fn login<S: CartStore, C: CatalogStore>(
    State(state): State<Arc<AppState<S, C>>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.login(&req.email, &req.password).await?;

    if let Some(session_id) = caller_session(&headers)? {
        state.carts.merge_on_login(session_id, user.id).await?;
    }

    Ok(Json(user.into()))
}
