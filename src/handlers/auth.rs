//! 认证相关的 HTTP 处理器

use crate::{
    auth::middleware::AuthContext,
    error::AppError,
    middleware::AppState,
    models::auth::*,
    models::session::ClientMeta,
    models::user::RegisterRequest,
};
use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

/// 注册新用户
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let user = state.user_service.register(req).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// 登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let client = client_meta(&headers);
    let response = state.auth_service.login(&req.email, &req.password, client).await?;

    Ok(Json(response))
}

/// 登出
///
/// 无论令牌是否匹配到会话都返回成功
pub async fn logout(
    State(state): State<Arc<AppState>>,
    _auth_context: AuthContext,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.logout(req.refresh_token.as_deref()).await?;

    Ok(Json(json!({ "message": "已成功登出" })))
}

/// 刷新令牌
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token_pair = state.auth_service.refresh(&req.refresh_token).await?;

    Ok(Json(token_pair))
}

/// 获取当前会话信息；未认证时 authenticated=false 而非 401
pub async fn current_session(
    auth_context: Option<AuthContext>,
) -> Result<impl IntoResponse, AppError> {
    let response = match auth_context {
        Some(ctx) => SessionInfoResponse {
            authenticated: true,
            user: Some(SessionUser {
                id: ctx.user_id,
                email: ctx.email,
                role: ctx.role,
            }),
        },
        None => SessionInfoResponse {
            authenticated: false,
            user: None,
        },
    };

    Ok(Json(response))
}

/// 收集客户端元数据，内容不做解析，原样透传给会话记录
fn client_meta(headers: &HeaderMap) -> ClientMeta {
    ClientMeta {
        user_agent: headers.get("user-agent").and_then(|v| v.to_str().ok()).map(|s| s.to_string()),
        ip_address: get_client_ip(headers),
    }
}

/// 获取客户端 IP 地址
fn get_client_ip(headers: &HeaderMap) -> Option<String> {
    // 首先检查 X-Forwarded-For（代理情况）
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // X-Forwarded-For 可能包含多个 IP，取第一个
            if let Some(first_ip) = forwarded_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    // 然后检查 X-Real-IP
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.to_string());
        }
    }

    None
}
