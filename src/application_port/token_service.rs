use crate::domain_model::{Identity, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use super::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

/// Secrets and lifetimes handed to the token service at construction.
#[derive(Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub access_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_secret: Vec<u8>,
    pub refresh_ttl: Duration,
    pub leeway: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("issuer", &self.issuer)
            .field("access_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_secret", &"<redacted>")
            .field("refresh_ttl", &self.refresh_ttl)
            .field("leeway", &self.leeway)
            .finish()
    }
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    /// Mints a fresh pair for `identity` and persists the refresh token onto it,
    /// overwriting whatever was stored before.
    async fn issue_pair(&self, identity: &mut Identity) -> Result<TokenPair, AuthError>;

    fn verify_access(&self, token: &str) -> Result<UserId, AuthError>;

    /// Exchanges the currently stored refresh token for a new pair. Any other
    /// refresh token, including one rotated out earlier, fails with `TokenMismatch`.
    async fn rotate(&self, refresh_token: &str) -> Result<(Identity, TokenPair), AuthError>;

    async fn revoke(&self, user_id: UserId) -> Result<(), AuthError>;
}
