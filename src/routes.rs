//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::middleware::{jwt_auth_middleware, optional_auth_middleware},
    handlers,
    middleware::{request_tracking_middleware, AppState},
};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    let codec = state.token_codec.clone();

    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 认证路由（无需认证）
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh));

    // 当前会话信息：可选认证，没有令牌时返回 authenticated=false
    let session_routes = Router::new()
        .route("/api/auth/session", get(handlers::auth::current_session))
        .layer(from_fn_with_state(codec.clone(), optional_auth_middleware));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/user/profile",
            get(handlers::user::get_profile).put(handlers::user::update_profile),
        )
        .route("/api/user/sessions", get(handlers::user::get_own_sessions))
        // 用户管理（处理器内部检查 ADMIN 角色）
        .route(
            "/api/admin/users",
            get(handlers::user::list_users).post(handlers::user::create_user),
        )
        .route(
            "/api/admin/users/{id}",
            get(handlers::user::get_user)
                .put(handlers::user::update_user)
                .delete(handlers::user::delete_user),
        )
        .route("/api/admin/users/{id}/sessions", get(handlers::user::list_user_sessions))
        .layer(from_fn_with_state(codec.clone(), jwt_auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(session_routes)
        .merge(authenticated_routes)
        .layer(from_fn(request_tracking_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}

/// 根据配置构建 CORS 层；未配置来源时为宽松模式
fn cors_layer(state: &AppState) -> CorsLayer {
    match &state.config.server.cors_origin {
        Some(origin) => match origin.parse::<axum::http::HeaderValue>() {
            Ok(value) => CorsLayer::new()
                .allow_origin(AllowOrigin::exact(value))
                .allow_methods(Any)
                .allow_headers(Any),
            Err(_) => {
                tracing::warn!(origin = %origin, "Invalid CORS origin, falling back to permissive");
                CorsLayer::permissive()
            }
        },
        None => CorsLayer::permissive(),
    }
}
