//! 测试公共模块
//! 提供内存版存储实现与测试辅助函数

#![allow(dead_code)]

use async_trait::async_trait;
use auth_system::{
    auth::jwt::TokenCodec,
    auth::password::PasswordHasher,
    config::{AppConfig, DatabaseConfig, LoggingConfig, SecurityConfig, ServerConfig},
    error::AppError,
    models::session::{NewSession, Session},
    models::user::{NewUser, RegisterRequest, User, UserChanges, UserResponse},
    repository::{SessionStore, UserStore},
    services::{AuthService, UserService},
};
use chrono::{DateTime, Utc};
use secrecy::Secret;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 创建测试配置
pub fn create_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            addr: "127.0.0.1:0".to_string(),
            graceful_shutdown_timeout_secs: 5,
            cors_origin: None,
        },
        database: DatabaseConfig {
            url: Secret::new("postgresql://localhost/test".to_string()),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_lifetime_secs: 1800,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            access_token_secret: Secret::new(
                "test-access-secret-for-testing-min-32-chars".to_string(),
            ),
            refresh_token_secret: Secret::new(
                "test-refresh-secret-for-testing-min-32-char".to_string(),
            ),
            access_token_ttl: "15m".to_string(),
            refresh_token_ttl: "7d".to_string(),
        },
    }
}

/// 内存版用户存储
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            role: new_user.role,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        };

        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.users.lock().unwrap().clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

/// 内存版会话存储
///
/// rotate 的条件语义与 Postgres 实现一致：仅当行的当前令牌
/// 仍等于传入值时才改写。用户查找委托给共享的用户存储。
pub struct MemorySessionStore {
    sessions: Mutex<Vec<Session>>,
    users: Arc<MemoryUserStore>,
}

impl MemorySessionStore {
    pub fn new(users: Arc<MemoryUserStore>) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            users,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, new_session: NewSession) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: new_session.user_id,
            refresh_token: new_session.refresh_token,
            user_agent: new_session.user_agent,
            ip_address: new_session.ip_address,
            expires_at: new_session.expires_at,
            created_at: now,
            updated_at: now,
        };

        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AppError> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions.iter().find(|s| s.refresh_token == token).cloned())
    }

    async fn find_by_token_with_user(
        &self,
        token: &str,
    ) -> Result<Option<(Session, User)>, AppError> {
        let session = self.find_by_token(token).await?;

        let Some(session) = session else {
            return Ok(None);
        };

        let user = self.users.find_by_id(session.user_id).await?;
        Ok(user.map(|u| (session, u)))
    }

    async fn rotate(
        &self,
        id: Uuid,
        current_token: &str,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut sessions = self.sessions.lock().unwrap();

        let Some(session) =
            sessions.iter_mut().find(|s| s.id == id && s.refresh_token == current_token)
        else {
            return Ok(false);
        };

        session.refresh_token = new_token.to_string();
        session.expires_at = expires_at;
        session.updated_at = Utc::now();

        Ok(true)
    }

    async fn delete_by_token(&self, token: &str) -> Result<u64, AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.refresh_token != token);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Session>, AppError> {
        let sessions = self.sessions.lock().unwrap();
        let mut result: Vec<Session> =
            sessions.iter().filter(|s| s.user_id == user_id).cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

/// 组装好的测试环境
pub struct TestHarness {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub user_store: Arc<MemoryUserStore>,
    pub session_store: Arc<MemorySessionStore>,
    pub codec: Arc<TokenCodec>,
}

/// 用内存存储组装全部服务
pub fn build_harness() -> TestHarness {
    let config = create_test_config();

    let user_store = Arc::new(MemoryUserStore::new());
    let session_store = Arc::new(MemorySessionStore::new(user_store.clone()));
    let codec = Arc::new(TokenCodec::from_config(&config).expect("codec from test config"));
    let hasher = Arc::new(PasswordHasher::new());

    let auth_service = AuthService::new(
        user_store.clone(),
        session_store.clone(),
        codec.clone(),
        hasher.clone(),
    );

    let user_service = UserService::new(user_store.clone(), session_store.clone(), hasher);

    TestHarness {
        auth_service,
        user_service,
        user_store,
        session_store,
        codec,
    }
}

/// 注册一个用户的便捷封装
pub async fn register_user(
    harness: &TestHarness,
    email: &str,
    password: &str,
    name: &str,
) -> UserResponse {
    harness
        .user_service
        .register(RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        })
        .await
        .expect("register should succeed")
}
