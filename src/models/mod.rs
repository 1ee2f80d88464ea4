//! 数据模型模块
//! 用户、会话与认证相关的领域模型和 DTO

pub mod auth;
pub mod session;
pub mod user;
