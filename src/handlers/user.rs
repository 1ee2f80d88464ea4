//! 用户管理的 HTTP 处理器
//! 自助资料端点与管理员 CRUD

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::user::{CreateUserRequest, UpdateUserRequest, UserRole},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

// ==================== 自助端点 ====================

/// 获取当前用户资料
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let user = state.user_service.get_user(auth_context.user_id).await?;

    Ok(Json(json!({ "user": user })))
}

/// 更新当前用户资料；请求里的 role 字段在这条路径上被忽略
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let user = state.user_service.update_user(auth_context.user_id, req, false).await?;

    Ok(Json(json!({ "user": user })))
}

/// 获取当前用户的会话列表
pub async fn get_own_sessions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.auth_service.list_sessions(auth_context.user_id).await?;

    Ok(Json(json!({ "sessions": sessions })))
}

// ==================== 管理员端点 ====================

/// 列出所有用户
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role(&[UserRole::Admin])?;

    let users = state.user_service.list_users().await?;

    Ok(Json(json!({ "users": users })))
}

/// 获取用户详情
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role(&[UserRole::Admin])?;

    let user = state.user_service.get_user(id).await?;

    Ok(Json(json!({ "user": user })))
}

/// 创建用户（角色由请求指定）
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role(&[UserRole::Admin])?;

    req.validate()?;

    let user = state.user_service.create_by_admin(req).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// 更新用户（管理路径允许修改角色）
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role(&[UserRole::Admin])?;

    req.validate()?;

    let user = state.user_service.update_user(id, req, true).await?;

    Ok(Json(json!({ "user": user })))
}

/// 删除用户；其全部会话随之撤销
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role(&[UserRole::Admin])?;

    state.user_service.delete_user(id).await?;

    Ok(Json(json!({ "message": "用户已删除" })))
}

/// 获取指定用户的会话列表
pub async fn list_user_sessions(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth_context.require_role(&[UserRole::Admin])?;

    // 确认用户存在，避免对不存在的 id 返回空列表
    state.user_service.get_user(id).await?;

    let sessions = state.auth_service.list_sessions(id).await?;

    Ok(Json(json!({ "sessions": sessions })))
}
