//! 用户服务：注册、查询、更新与删除

use crate::{
    auth::password::PasswordHasher,
    error::AppError,
    models::user::{
        CreateUserRequest, NewUser, RegisterRequest, UpdateUserRequest, UserChanges, UserResponse,
        UserRole,
    },
    repository::{SessionStore, UserStore},
};
use std::sync::Arc;
use uuid::Uuid;

pub struct UserService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<PasswordHasher>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<PasswordHasher>,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
        }
    }

    /// 公开注册；角色固定为 CLIENT
    pub async fn register(&self, req: RegisterRequest) -> Result<UserResponse, AppError> {
        self.create_user(req.email, req.name, req.password, UserRole::Client).await
    }

    /// 管理员创建用户；角色由调用方指定
    pub async fn create_by_admin(&self, req: CreateUserRequest) -> Result<UserResponse, AppError> {
        self.create_user(req.email, req.name, req.password, req.role).await
    }

    async fn create_user(
        &self,
        email: String,
        name: String,
        password: String,
        role: UserRole,
    ) -> Result<UserResponse, AppError> {
        // 邮箱唯一性在写入前检查，数据库唯一索引兜底
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::BadRequest("A user with this email already exists".to_string()));
        }

        let password_hash = self.hash_password(password).await?;

        let user = self
            .users
            .insert(NewUser {
                email,
                name,
                role,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");

        Ok(UserResponse::from(user))
    }

    /// 根据 ID 获取用户（不含密码哈希的投影）
    pub async fn get_user(&self, id: Uuid) -> Result<UserResponse, AppError> {
        let user = self.users.find_by_id(id).await?.ok_or(AppError::NotFound)?;

        Ok(UserResponse::from(user))
    }

    /// 更新用户
    ///
    /// `allow_role_change` 区分管理路径与自助路径：自助更新永远
    /// 不改角色。密码仅在提供时重新哈希。
    pub async fn update_user(
        &self,
        id: Uuid,
        req: UpdateUserRequest,
        allow_role_change: bool,
    ) -> Result<UserResponse, AppError> {
        let current = self.users.find_by_id(id).await?.ok_or(AppError::NotFound)?;

        // 换邮箱时检查新邮箱没有被占用
        if let Some(new_email) = &req.email {
            if *new_email != current.email
                && self.users.find_by_email(new_email).await?.is_some()
            {
                return Err(AppError::BadRequest(
                    "A user with this email already exists".to_string(),
                ));
            }
        }

        let password_hash = match req.password {
            Some(password) => Some(self.hash_password(password).await?),
            None => None,
        };

        let changes = UserChanges {
            email: req.email,
            name: req.name,
            role: if allow_role_change { req.role } else { None },
            password_hash,
        };

        let user = self.users.update(id, changes).await?.ok_or(AppError::NotFound)?;

        tracing::info!(user_id = %user.id, "User updated");

        Ok(UserResponse::from(user))
    }

    /// 删除用户并撤销其全部会话
    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        if self.users.find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        // 显式撤销会话；Postgres 外键级联在存储层兜底
        self.sessions.delete_all_for_user(id).await?;
        self.users.delete(id).await?;

        tracing::info!(user_id = %id, "User deleted");

        Ok(())
    }

    /// 列出所有用户
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, AppError> {
        let users = self.users.list().await?;

        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// 在阻塞线程池上哈希密码
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|_| AppError::Internal)?
    }
}
