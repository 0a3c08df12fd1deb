use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String, // user id as string
    username: String,
    email: String,
    full_name: String,
    iss: String,
    iat: i64,
    exp: i64,
    jti: String,
    kind: TokenKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String, // user id as string
    iss: String,
    iat: i64,
    exp: i64,
    jti: String, // keeps two refresh tokens minted in the same second distinct
    kind: TokenKind,
}

fn sign<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, AuthError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::InternalError(e.to_string()))
}

fn encode_access(
    identity: &Identity,
    cfg: &TokenConfig,
    issued_at: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let exp_dt = issued_at + cfg.access_ttl;
    let claims = AccessClaims {
        sub: identity.user_id.to_string(),
        username: identity.username.clone(),
        email: identity.email.clone(),
        full_name: identity.full_name.clone(),
        iss: cfg.issuer.clone(),
        iat: issued_at.timestamp(),
        exp: exp_dt.timestamp(),
        jti: Uuid::new_v4().to_string(),
        kind: TokenKind::Access,
    };
    Ok((sign(&claims, &cfg.access_secret)?, exp_dt))
}

fn encode_refresh(
    user_id: UserId,
    cfg: &TokenConfig,
    issued_at: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), AuthError> {
    let exp_dt = issued_at + cfg.refresh_ttl;
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        iss: cfg.issuer.clone(),
        iat: issued_at.timestamp(),
        exp: exp_dt.timestamp(),
        jti: Uuid::new_v4().to_string(),
        kind: TokenKind::Refresh,
    };
    Ok((sign(&claims, &cfg.refresh_secret)?, exp_dt))
}

fn validation(cfg: &TokenConfig) -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.leeway = cfg.leeway.as_secs();
    v.set_issuer(&[cfg.issuer.clone()]);
    v.set_required_spec_claims(&["exp", "sub", "iss"]);
    v
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    }
}

fn decode_access(token: &str, cfg: &TokenConfig) -> Result<AccessClaims, AuthError> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(&cfg.access_secret),
        &validation(cfg),
    )
    .map_err(map_decode_error)?;
    if data.claims.kind != TokenKind::Access {
        return Err(AuthError::TokenInvalid);
    }
    Ok(data.claims)
}

fn decode_refresh(token: &str, cfg: &TokenConfig) -> Result<RefreshClaims, AuthError> {
    let data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(&cfg.refresh_secret),
        &validation(cfg),
    )
    .map_err(map_decode_error)?;
    if data.claims.kind != TokenKind::Refresh {
        return Err(AuthError::TokenInvalid);
    }
    Ok(data.claims)
}

/// Anything going wrong while writing token state is reported as a
/// persistence failure.
fn persistence(e: AuthError) -> AuthError {
    match e {
        AuthError::Persistence(_) => e,
        other => AuthError::Persistence(other.to_string()),
    }
}

/// HS256 access/refresh tokens with the live refresh token mirrored onto the
/// identity record.
pub struct JwtTokenService {
    cfg: TokenConfig,
    user_repo: Arc<dyn UserRepo>,
}

impl JwtTokenService {
    pub fn new(cfg: TokenConfig, user_repo: Arc<dyn UserRepo>) -> Self {
        JwtTokenService { cfg, user_repo }
    }

    #[inline]
    fn parse_user_id(sub: &str) -> Result<UserId, AuthError> {
        sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)
    }

    fn mint_pair(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let (access_token, access_exp) = encode_access(identity, &self.cfg, issued_at)?;
        let (refresh_token, refresh_exp) = encode_refresh(identity.user_id, &self.cfg, issued_at)?;
        Ok(TokenPair {
            access_token: AccessToken(access_token),
            refresh_token: RefreshToken(refresh_token),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

#[async_trait::async_trait]
impl TokenService for JwtTokenService {
    async fn issue_pair(&self, identity: &mut Identity) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let pair = self.mint_pair(identity, now)?;

        // Only the token column: `identity` may be an older snapshot.
        self.user_repo
            .set_refresh_token(identity.user_id, Some(&pair.refresh_token.0))
            .await
            .map_err(persistence)?;

        identity.refresh_token = Some(pair.refresh_token.0.clone());
        identity.updated_at = now;
        debug!(user_id = %identity.user_id, "issued token pair");
        Ok(pair)
    }

    fn verify_access(&self, token: &str) -> Result<UserId, AuthError> {
        let claims = decode_access(token, &self.cfg)?;
        Self::parse_user_id(&claims.sub)
    }

    async fn rotate(&self, refresh_token: &str) -> Result<(Identity, TokenPair), AuthError> {
        let claims = decode_refresh(refresh_token, &self.cfg)?;
        let user_id = Self::parse_user_id(&claims.sub)?;

        let mut identity = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::IdentityNotFound)?;

        if identity.refresh_token.as_deref() != Some(refresh_token) {
            warn!(%user_id, "refresh token does not match the stored one");
            return Err(AuthError::TokenMismatch);
        }

        let now = Utc::now();
        let pair = self.mint_pair(&identity, now)?;

        // Conditional on the token we just checked, so two concurrent
        // rotations of the same token cannot both win.
        let swapped = self
            .user_repo
            .compare_and_set_refresh_token(user_id, refresh_token, Some(&pair.refresh_token.0))
            .await
            .map_err(persistence)?;
        if !swapped {
            warn!(%user_id, "refresh token rotated concurrently");
            return Err(AuthError::TokenMismatch);
        }

        identity.refresh_token = Some(pair.refresh_token.0.clone());
        identity.updated_at = now;
        debug!(%user_id, "rotated refresh token");
        Ok((identity, pair))
    }

    async fn revoke(&self, user_id: UserId) -> Result<(), AuthError> {
        self.user_repo
            .set_refresh_token(user_id, None)
            .await
            .map_err(|e| match e {
                AuthError::IdentityNotFound => e,
                other => persistence(other),
            })?;

        debug!(%user_id, "revoked refresh token");
        Ok(())
    }
}
