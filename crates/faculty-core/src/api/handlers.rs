//! HTTP handlers for the auth and admin endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::info;

use super::{ApiResponse, ApiState};
use crate::auth::LoginResponse;
use crate::error::AccessDenied;
use crate::filter::{Principal, RequestContext};
use crate::types::{
    CreateUserRequest, NewIdentity, Role, RoleInfo, UpdateUserRequest, UserFilter, UserSummary,
};
use crate::validation::{validate_create_user, validate_login, validate_update_user};
use crate::{Error, Result};

/// Login request body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn require_principal(context: &RequestContext) -> Result<&Principal> {
    context
        .principal()
        .ok_or(Error::Access(AccessDenied::Unauthenticated))
}

pub async fn login(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    let Json(request) = payload?;
    validate_login(&request.username, &request.password)?;

    let response = state
        .auth_service
        .login(request.username.trim(), &request.password)
        .await?;
    Ok(Json(ApiResponse::success("Login successful", response)))
}

pub async fn logout(
    State(state): State<ApiState>,
    Extension(mut context): Extension<RequestContext>,
) -> Json<ApiResponse<()>> {
    state.auth_service.logout(&mut context);
    Json(ApiResponse::success("Logout successful, discard the access token", ()))
}

pub async fn me(
    State(state): State<ApiState>,
    Extension(context): Extension<RequestContext>,
) -> Result<Json<ApiResponse<UserSummary>>> {
    let principal = require_principal(&context)?;
    let identity = state.auth_service.current_user(principal).await?;
    Ok(Json(ApiResponse::success("Current user", UserSummary::from(&identity))))
}

pub async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("API is running", "OK"))
}

pub async fn list_users(
    State(state): State<ApiState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>> {
    let users = state.users.list_users(filter).await?;
    let summaries = users.iter().map(UserSummary::from).collect();
    Ok(Json(ApiResponse::success("Users", summaries)))
}

pub async fn get_user(
    State(state): State<ApiState>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<UserSummary>>> {
    let identity = state
        .users
        .get_user(user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
    Ok(Json(ApiResponse::success("User", UserSummary::from(&identity))))
}

pub async fn create_user(
    State(state): State<ApiState>,
    Extension(context): Extension<RequestContext>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserSummary>>)> {
    let actor = require_principal(&context)?;
    let Json(request) = payload?;
    validate_create_user(&request)?;

    let password_hash = state
        .auth_service
        .passwords()
        .hash_blocking(request.password)
        .await?;

    let identity = state
        .users
        .create_user(NewIdentity {
            username: request.username,
            password_hash,
            email: request.email,
            phone: request.phone,
            full_name: request.full_name.trim().to_string(),
            role: request.role_name,
            active: true,
        })
        .await?;

    info!(user_id = identity.id, role = %identity.role, "{} created user {}", actor.username, identity.username);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User created", UserSummary::from(&identity))),
    ))
}

pub async fn update_user(
    State(state): State<ApiState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i64>,
    payload: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserSummary>>> {
    let actor = require_principal(&context)?;
    let Json(mut update) = payload?;
    validate_update_user(&update)?;
    update.full_name = update.full_name.map(|name| name.trim().to_string());

    let updated = state.users.update_user(user_id, update).await?;
    info!(user_id, role = %updated.role, active = updated.active, "{} updated user {}", actor.username, updated.username);
    Ok(Json(ApiResponse::success("User updated", UserSummary::from(&updated))))
}

pub async fn delete_user(
    State(state): State<ApiState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let actor = require_principal(&context)?;
    state.users.delete_user(user_id).await?;
    info!(user_id, "{} deactivated user {}", actor.username, user_id);
    Ok(Json(ApiResponse::success("User deleted", ())))
}

pub async fn toggle_user_status(
    State(state): State<ApiState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<UserSummary>>> {
    let actor = require_principal(&context)?;
    let identity = state
        .users
        .get_user(user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

    let updated = state.users.set_active(user_id, !identity.active).await?;
    info!(user_id, active = updated.active, "{} toggled status of {}", actor.username, updated.username);
    Ok(Json(ApiResponse::success("User status updated", UserSummary::from(&updated))))
}

pub async fn list_roles() -> Json<ApiResponse<Vec<RoleInfo>>> {
    let roles = Role::ALL.into_iter().map(RoleInfo::from).collect();
    Json(ApiResponse::success("Roles", roles))
}
