//! JWT token generation and validation
//! Implements the access token + refresh token pair with independent secrets

use crate::{config::AppConfig, error::AppError, models::user::UserRole};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which secret a token is signed and verified with
///
/// Access and refresh tokens use independent secrets so that leaking one
/// does not let an attacker synthesize the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in every token: the minimal identity projection
/// (id, email, role) plus the standard time claims. Nothing else from
/// the user record travels inside tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenPayload {
    /// Subject (user ID)
    pub sub: Uuid,

    /// Email at issue time
    pub email: String,

    /// Role at issue time
    pub role: UserRole,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

/// Token pair response; the access token is never persisted server-side
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token codec holding both signing key pairs and the configured lifetimes
pub struct TokenCodec {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    access_token_ttl: String,
    refresh_token_ttl: String,
}

impl TokenCodec {
    /// Create the codec from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let access_secret = config.security.access_token_secret.expose_secret();
        let refresh_secret = config.security.refresh_token_secret.expose_secret();

        // Ensure secrets are long enough for HS256
        if access_secret.len() < 32 || refresh_secret.len() < 32 {
            return Err(AppError::Config("Token secrets too short (min 32 chars)".to_string()));
        }

        Ok(Self {
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_token_ttl: config.security.access_token_ttl.clone(),
            refresh_token_ttl: config.security.refresh_token_ttl.clone(),
        })
    }

    /// Issue a token of the given kind carrying the identity projection
    pub fn issue(
        &self,
        kind: TokenKind,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let lifetime = match kind {
            TokenKind::Access => parse_lifetime(&self.access_token_ttl),
            TokenKind::Refresh => parse_lifetime(&self.refresh_token_ttl),
        };

        let payload = TokenPayload {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding_key,
            TokenKind::Refresh => &self.refresh_encoding_key,
        };

        encode(&Header::default(), &payload, key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal
        })
    }

    /// Issue an access + refresh pair for the same identity
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<TokenPair, AppError> {
        let access_token = self.issue(TokenKind::Access, user_id, email, role)?;
        let refresh_token = self.issue(TokenKind::Refresh, user_id, email, role)?;

        Ok(TokenPair { access_token, refresh_token })
    }

    /// Verify signature and expiry against the secret for `kind`
    ///
    /// Returns `None` on any failure (bad signature, wrong secret,
    /// expired, malformed) instead of an error; callers branch on
    /// validity and decide what an invalid token means for them.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Option<TokenPayload> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding_key,
            TokenKind::Refresh => &self.refresh_decoding_key,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<TokenPayload>(token, key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Token validation failed: {:?}", e);
                None
            }
        }
    }

    /// Compute "now + configured refresh lifetime"
    ///
    /// This value is persisted alongside each session row and recomputed
    /// the same way on every rotation. The lifetime string is re-parsed
    /// on each call so a config change takes effect without restarting
    /// anything in between.
    pub fn refresh_expires_at(&self) -> DateTime<Utc> {
        Utc::now() + parse_lifetime(&self.refresh_token_ttl)
    }
}

/// Seven days, the fallback lifetime for unparseable duration strings
fn default_lifetime() -> Duration {
    Duration::days(7)
}

/// Parse a duration string with unit suffix: `s`, `m`, `h` or `d`
///
/// An unrecognized unit or a malformed value falls back to 7 days.
pub fn parse_lifetime(value: &str) -> Duration {
    let Some(unit) = value.chars().last() else {
        return default_lifetime();
    };

    // 按字符宽度切掉单位后缀；多字节后缀按字节切会切在字符中间
    let Ok(amount) = value[..value.len() - unit.len_utf8()].parse::<i64>() else {
        return default_lifetime();
    };

    if amount < 0 {
        return default_lifetime();
    }

    match unit {
        's' => Duration::seconds(amount),
        'm' => Duration::minutes(amount),
        'h' => Duration::hours(amount),
        'd' => Duration::days(amount),
        _ => default_lifetime(),
    }
}
