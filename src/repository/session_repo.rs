//! Session repository (数据库访问层)
//!
//! 轮换走条件 UPDATE（以当前令牌值为条件），数据库的原子性保证并发
//! 刷新同一令牌时只有一方改写成功，输掉的一方看到零行受影响。

use crate::{
    error::AppError,
    models::session::{NewSession, Session},
    models::user::User,
    repository::SessionStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    /// 创建会话
    async fn create(&self, new_session: NewSession) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token, user_agent, ip_address, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_session.user_id)
        .bind(&new_session.refresh_token)
        .bind(&new_session.user_agent)
        .bind(&new_session.ip_address)
        .bind(new_session.expires_at)
        .fetch_one(&self.db)
        .await?;

        Ok(session)
    }

    /// 按字面令牌值查找会话
    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE refresh_token = $1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?;

        Ok(session)
    }

    /// 按令牌查找会话及其所属用户
    async fn find_by_token_with_user(
        &self,
        token: &str,
    ) -> Result<Option<(Session, User)>, AppError> {
        let Some(session) = self.find_by_token(token).await? else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(session.user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user.map(|u| (session, u)))
    }

    /// 原地轮换令牌与过期时间
    async fn rotate(
        &self,
        id: Uuid,
        current_token: &str,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET
                refresh_token = $3,
                expires_at = $4,
                updated_at = NOW()
            WHERE id = $1 AND refresh_token = $2
            "#,
        )
        .bind(id)
        .bind(current_token)
        .bind(new_token)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 删除匹配令牌的会话
    async fn delete_by_token(&self, token: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE refresh_token = $1")
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// 删除用户的所有会话
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }

    /// 按创建时间倒序列出用户的会话
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(sessions)
    }
}
