//! Database repository layer
//!
//! The store traits are the seams between the lifecycle services and the
//! persistence backend; tests substitute in-memory implementations.

pub mod session_repo;
pub mod user_repo;

pub use session_repo::PgSessionStore;
pub use user_repo::PgUserStore;

use crate::{
    error::AppError,
    models::session::{NewSession, Session},
    models::user::{NewUser, User, UserChanges},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 用户存储接口
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn insert(&self, new_user: NewUser) -> Result<User, AppError>;

    /// 按字段部分更新，用户不存在时返回 None
    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;
}

/// 会话存储接口
///
/// 会话以字面 refresh token 字符串为查找键；轮换是条件更新，
/// 并发轮换同一令牌时最多只有一方成功。
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, new_session: NewSession) -> Result<Session, AppError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AppError>;

    async fn find_by_token_with_user(
        &self,
        token: &str,
    ) -> Result<Option<(Session, User)>, AppError>;

    /// 原地替换令牌与过期时间；仅当行的当前令牌仍是 `current_token`
    /// 时生效，返回是否写入成功
    async fn rotate(
        &self,
        id: Uuid,
        current_token: &str,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// 删除匹配令牌的会话，返回删除行数（零行也是成功）
    async fn delete_by_token(&self, token: &str) -> Result<u64, AppError>;

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// 按创建时间倒序列出用户的会话
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, AppError>;
}
