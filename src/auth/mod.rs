//! Authentication and authorization module

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{TokenCodec, TokenKind, TokenPair, TokenPayload};
pub use middleware::{extract_token, jwt_auth_middleware, optional_auth_middleware, AuthContext};
pub use password::PasswordHasher;
