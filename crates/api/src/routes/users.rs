//! Customer registration and lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use storage::{NewUser, Store, User};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub account: String,
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user_id: i64,
    pub account: String,
    pub username: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id.as_i64(),
            account: user.account,
            username: user.username,
        }
    }
}

/// POST /api/users — register a customer.
#[tracing::instrument(skip(state, req))]
pub async fn register<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if req.account.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "account and password are required".to_string(),
        ));
    }

    let user_id = state
        .store
        .insert_user(NewUser {
            account: req.account.clone(),
            username: req.username.clone(),
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user_id: user_id.as_i64(),
            account: req.account,
            username: req.username,
        }),
    ))
}

/// GET /api/users/{account} — look up a customer by account name.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(account): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .get_user_by_account(&account)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {account} not found")))?;

    Ok(Json(user.into()))
}
