use std::sync::Arc;

use avia_shared::{Masked, StoreError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::User;
use crate::repository::TokenBlacklistRepository;

pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 3600;

/// Signing settings handed to the gateway at startup.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_ttl")]
    pub jwt_expiration_seconds: u64,
}

fn default_ttl() -> u64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &Masked(&self.jwt_secret))
            .field("jwt_expiration_seconds", &self.jwt_expiration_seconds)
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub user_id: i64,
    /// Random per token, so two tokens issued in the same second differ.
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingCredentials,
    #[error("Invalid authorization header")]
    MalformedHeader,
    #[error("Token has been revoked")]
    TokenRevoked,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("User not found")]
    UnknownUser,
    #[error("Admin rights required")]
    Forbidden,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Issues, verifies and revokes bearer tokens.
pub struct AuthGateway {
    config: AuthConfig,
    blacklist: Arc<dyn TokenBlacklistRepository>,
}

impl AuthGateway {
    pub fn new(config: AuthConfig, blacklist: Arc<dyn TokenBlacklistRepository>) -> Self {
        Self { config, blacklist }
    }

    pub fn token_ttl(&self) -> u64 {
        self.config.jwt_expiration_seconds
    }

    pub fn issue(&self, user_id: i64) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, Utc::now())
    }

    fn issue_at(&self, user_id: i64, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let ttl = self.token_ttl();
        let claims = Claims {
            user_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl as i64)).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, expires_in: ttl })
    }

    /// Resolves a bearer token to its user id. Revocation is checked before the
    /// signature. Blacklist entries only count until the token's own expiry, so
    /// an expired revoked token reports as expired.
    pub async fn authenticate(&self, token: &str) -> Result<i64, AuthError> {
        if self.blacklist.is_blacklisted(token, Utc::now()).await? {
            return Err(AuthError::TokenRevoked);
        }

        let claims = self.decode(token)?;
        Ok(claims.user_id)
    }

    /// Blacklists a still-valid token until its expiry and sweeps entries that
    /// expired already. Tokens that fail verification are ignored.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let now = Utc::now();

        if let Ok(claims) = self.decode(token) {
            let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0).unwrap_or(now);
            self.blacklist.add(token, claims.user_id, expires_at).await?;
            tracing::info!(user_id = claims.user_id, token = %Masked(token), "Token revoked");
        }

        let swept = self.blacklist.clean_expired(now).await?;
        if swept > 0 {
            tracing::debug!(swept, "Expired blacklist entries removed");
        }
        Ok(())
    }

    fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MalformedHeader)
}

/// Gate for the admin routes.
pub struct AdminAuthorizer;

impl AdminAuthorizer {
    pub fn authorize(user: &User) -> Result<(), AuthError> {
        if user.is_admin() {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{NewUser, Role};
    use async_trait::async_trait;
    use avia_shared::RepoResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct VecBlacklist {
        entries: Mutex<Vec<(String, i64, DateTime<Utc>)>>,
    }

    #[async_trait]
    impl TokenBlacklistRepository for VecBlacklist {
        async fn add(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> RepoResult<()> {
            self.entries.lock().unwrap().push((token.to_string(), user_id, expires_at));
            Ok(())
        }

        async fn is_blacklisted(&self, token: &str, now: DateTime<Utc>) -> RepoResult<bool> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .any(|(t, _, expires_at)| t == token && *expires_at > now))
        }

        async fn clean_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|(_, _, expires_at)| *expires_at >= now);
            Ok((before - entries.len()) as u64)
        }
    }

    fn gateway() -> (AuthGateway, Arc<VecBlacklist>) {
        let blacklist = Arc::new(VecBlacklist::default());
        let config = AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_expiration_seconds: 3600,
        };
        (AuthGateway::new(config, blacklist.clone()), blacklist)
    }

    #[tokio::test]
    async fn test_issue_then_authenticate() {
        let (gateway, _) = gateway();
        let issued = gateway.issue(42).unwrap();

        assert_eq!(issued.expires_in, 3600);
        assert_eq!(gateway.authenticate(&issued.token).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let (gateway, _) = gateway();
        let a = gateway.issue(1).unwrap();
        let b = gateway.issue(1).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let (gateway, _) = gateway();
        let issued = gateway.issue_at(7, Utc::now() - Duration::hours(2)).unwrap();

        let err = gateway.authenticate(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn test_foreign_signature_is_rejected() {
        let (gateway, _) = gateway();
        let other = AuthGateway::new(
            AuthConfig { jwt_secret: "other".into(), jwt_expiration_seconds: 60 },
            Arc::new(VecBlacklist::default()),
        );
        let issued = other.issue(7).unwrap();

        let err = gateway.authenticate(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
        assert!(matches!(gateway.authenticate("garbage").await.unwrap_err(), AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let (gateway, blacklist) = gateway();
        let issued = gateway.issue(9).unwrap();

        gateway.revoke(&issued.token).await.unwrap();

        let err = gateway.authenticate(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));
        assert_eq!(blacklist.entries.lock().unwrap()[0].1, 9);
    }

    #[tokio::test]
    async fn test_revoked_token_reports_expired_after_exp() {
        let (gateway, blacklist) = gateway();
        let issued = gateway.issue_at(9, Utc::now() - Duration::hours(2)).unwrap();
        let exp = Utc::now() - Duration::hours(1);
        blacklist.add(&issued.token, 9, exp).await.unwrap();

        let err = gateway.authenticate(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
        assert_eq!(gateway.token_ttl(), 3600);
    }

    #[tokio::test]
    async fn test_revoke_ignores_invalid_and_sweeps_expired() {
        let (gateway, blacklist) = gateway();
        blacklist
            .add("stale", 1, Utc::now() - Duration::minutes(5))
            .await
            .unwrap();

        gateway.revoke("not-a-token").await.unwrap();

        assert!(blacklist.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(bearer_token(None), Err(AuthError::MissingCredentials)));
        assert!(matches!(bearer_token(Some("Basic abc")), Err(AuthError::MalformedHeader)));
        assert!(matches!(bearer_token(Some("Bearer ")), Err(AuthError::MalformedHeader)));
    }

    #[test]
    fn test_admin_authorizer() {
        let mut user = NewUser {
            first_name: "Anna".into(),
            last_name: "Ivanova".into(),
            phone: "79000000000".into(),
            document_number: "1".into(),
            password_hash: String::new(),
            role: Role::User,
        }
        .into_user(1, Utc::now());

        assert!(matches!(AdminAuthorizer::authorize(&user), Err(AuthError::Forbidden)));
        user.role = Role::Admin;
        assert!(AdminAuthorizer::authorize(&user).is_ok());
    }
}
