//! JWT 认证中间件

use crate::{
    auth::jwt::{TokenCodec, TokenKind},
    error::AppError,
    models::user::UserRole,
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// 认证上下文（附加到请求扩展）
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    /// 统一的角色判定入口，所有处理器都走这一个谓词
    pub fn has_role(&self, allowed: &[UserRole]) -> bool {
        allowed.contains(&self.role)
    }

    /// 角色不满足时返回 Forbidden
    pub fn require_role(&self, allowed: &[UserRole]) -> Result<(), AppError> {
        if self.has_role(allowed) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

// 实现 FromRequestParts 以便在 handler 中直接提取 AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthContext>().cloned().ok_or(AppError::Unauthorized)
    }
}

// Option<AuthContext> 用于可选认证的端点（如 /api/auth/session）
impl<S> OptionalFromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthContext>().cloned())
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .ok_or(AppError::Unauthorized)
}

/// JWT 认证中间件 - 必须认证
pub async fn jwt_auth_middleware(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 从 Authorization 头提取令牌
    let token = extract_token(req.headers())?;

    // 验证访问令牌，无效即拒绝
    let payload = codec.verify(&token, TokenKind::Access).ok_or(AppError::Unauthorized)?;

    let auth_context = AuthContext {
        user_id: payload.sub,
        email: payload.email,
        role: payload.role,
    };

    // 附加到请求扩展
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// 可选认证 - 不强制要求令牌
pub async fn optional_auth_middleware(
    State(codec): State<Arc<TokenCodec>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Ok(token) = extract_token(req.headers()) {
        if let Some(payload) = codec.verify(&token, TokenKind::Access) {
            let auth_context = AuthContext {
                user_id: payload.sub,
                email: payload.email,
                role: payload.role,
            };
            req.extensions_mut().insert(auth_context);
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer test_token_123".parse().unwrap());

        let token = extract_token(&headers).unwrap();
        assert_eq!(token, "test_token_123");
    }

    #[test]
    fn test_extract_token_missing() {
        let headers = HeaderMap::new();
        assert!(extract_token(&headers).is_err());
    }

    #[test]
    fn test_extract_token_invalid_format() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "InvalidFormat".parse().unwrap());

        assert!(extract_token(&headers).is_err());
    }

    #[test]
    fn test_has_role_predicate() {
        let ctx = AuthContext {
            user_id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            role: UserRole::Client,
        };

        assert!(ctx.has_role(&[UserRole::Client, UserRole::Admin]));
        assert!(!ctx.has_role(&[UserRole::Admin]));
        assert!(ctx.require_role(&[UserRole::Admin]).is_err());
    }
}
