//! 认证服务：登录、登出、令牌刷新与会话生命周期
//!
//! 会话状态机：不存在 → 活跃（登录）→ 原地轮换（刷新，仍为同一行）
//! → 撤销/过期（行被删除，终态）。存储层是会话有效性的唯一事实来源。

use crate::{
    auth::jwt::{TokenCodec, TokenKind, TokenPair},
    auth::password::PasswordHasher,
    error::AppError,
    models::auth::LoginResponse,
    models::session::{ClientMeta, NewSession, SessionResponse},
    models::user::UserResponse,
    repository::{SessionStore, UserStore},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    codec: Arc<TokenCodec>,
    hasher: Arc<PasswordHasher>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        codec: Arc<TokenCodec>,
        hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            users,
            sessions,
            codec,
            hasher,
        }
    }

    /// 用户登录
    ///
    /// 未知邮箱与密码错误对外是同一个 Unauthorized，不可区分；
    /// 登录过程中的任何意外失败同样收敛为 Unauthorized，内部细节
    /// 不穿过认证边界。
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: ClientMeta,
    ) -> Result<LoginResponse, AppError> {
        self.login_inner(email, password, client).await.map_err(|e| {
            if !matches!(e, AppError::Unauthorized) {
                tracing::warn!(error = %e, "Login failed with non-auth error");
            }
            AppError::Unauthorized
        })
    }

    async fn login_inner(
        &self,
        email: &str,
        password: &str,
        client: ClientMeta,
    ) -> Result<LoginResponse, AppError> {
        // 获取用户；不存在时与密码错误走同一条失败路径
        let user = self.users.find_by_email(email).await?.ok_or(AppError::Unauthorized)?;

        // 验证密码。Argon2 是 CPU 密集操作，放到阻塞线程池，
        // 不占用请求处理路径
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let password_hash = user.password_hash.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &password_hash))
            .await
            .map_err(|_| AppError::Internal)??;

        // 生成令牌对并计算会话过期时间
        let token_pair = self.codec.issue_pair(user.id, &user.email, user.role)?;
        let expires_at = self.codec.refresh_expires_at();

        // 创建会话
        self.sessions
            .create(NewSession {
                user_id: user.id,
                refresh_token: token_pair.refresh_token.clone(),
                user_agent: client.user_agent,
                ip_address: client.ip_address,
                expires_at,
            })
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            user: UserResponse::from(user),
            access_token: token_pair.access_token,
            refresh_token: token_pair.refresh_token,
        })
    }

    /// 刷新令牌（单次使用的原地轮换）
    ///
    /// 任何失败对外都是 Unauthorized。
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        self.refresh_inner(refresh_token).await.map_err(|e| {
            if !matches!(e, AppError::Unauthorized) {
                tracing::warn!(error = %e, "Token refresh failed with non-auth error");
            }
            AppError::Unauthorized
        })
    }

    async fn refresh_inner(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        // 签名与有效期校验
        if self.codec.verify(refresh_token, TokenKind::Refresh).is_none() {
            return Err(AppError::Unauthorized);
        }

        // 按字面令牌值查找会话与所属用户；之前的轮换可能已经
        // 消耗了这个令牌值，行不在即失败
        let (session, user) = self
            .sessions
            .find_by_token_with_user(refresh_token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        // 会话自身的过期时间已过：撤销该行并拒绝。签名还没过期
        // 不代表会话还活着
        if session.expires_at < Utc::now() {
            self.sessions.delete_by_token(refresh_token).await?;
            tracing::info!(session_id = %session.id, "Expired session revoked on refresh");
            return Err(AppError::Unauthorized);
        }

        // 以用户当前的身份投影铸造新令牌对
        let token_pair = self.codec.issue_pair(user.id, &user.email, user.role)?;
        let expires_at = self.codec.refresh_expires_at();

        // 原地轮换。并发刷新同一令牌时条件更新只让一方成功，
        // 输掉的一方在这里拿到 false
        let rotated = self
            .sessions
            .rotate(session.id, refresh_token, &token_pair.refresh_token, expires_at)
            .await?;

        if !rotated {
            return Err(AppError::Unauthorized);
        }

        tracing::debug!(session_id = %session.id, "Session rotated");

        Ok(token_pair)
    }

    /// 登出（撤销匹配令牌的会话）
    ///
    /// 幂等：没有匹配的会话也算成功。存储失败原样上抛为内部错误。
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AppError> {
        if let Some(token) = refresh_token {
            let removed = self.sessions.delete_by_token(token).await?;
            tracing::debug!(removed, "Logout completed");
        }

        Ok(())
    }

    /// 列出用户的活跃会话，新的在前，不暴露原始令牌值
    pub async fn list_sessions(&self, user_id: Uuid) -> Result<Vec<SessionResponse>, AppError> {
        let sessions = self.sessions.list_for_user(user_id).await?;

        Ok(sessions.into_iter().map(SessionResponse::from).collect())
    }

    /// 撤销用户的所有会话（删除用户或强制下线时使用）
    pub async fn delete_all_sessions(&self, user_id: Uuid) -> Result<u64, AppError> {
        let removed = self.sessions.delete_all_for_user(user_id).await?;

        if removed > 0 {
            tracing::info!(user_id = %user_id, removed, "All sessions revoked");
        }

        Ok(removed)
    }
}
