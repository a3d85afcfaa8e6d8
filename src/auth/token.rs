//! JWT token service.
//!
//! Tokens are HS256 JWTs carrying the user id. Every issued token is also
//! recorded in an in-memory registry keyed by `userId#jwt`, so logout can
//! actually revoke: a well-formed token that is no longer registered fails
//! verification as invalid, and an expired one is purged on sight.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use super::AuthError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    id: i64,
    iat: i64,
    exp: i64,
}

/// The outcome of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub user_id: i64,
    pub ttl_ms: i64,
    pub expires_at_ms: i64,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub user_id: i64,
    pub jwt: String,
    pub ttl_ms: i64,
    pub expires_at_ms: i64,
}

/// Credential verification as the authorization gate sees it. The gate is
/// handed this trait, not the concrete service.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// `InvalidToken` for malformed, forged or revoked credentials,
    /// `ExpiredToken` past expiry.
    async fn verify(&self, jwt: &str) -> Result<VerifiedToken, AuthError>;
}

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
    active: DashMap<String, IssuedToken>,
}

impl TokenService {
    pub fn new(secret: &str, default_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is enforced exactly; the registry is the source of truth
        // for revocation.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            default_ttl,
            active: DashMap::new(),
        }
    }

    /// Issue a token for a user, with an optional per-token TTL override.
    pub fn issue(&self, user_id: i64, ttl: Option<Duration>) -> Result<IssuedToken, AuthError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Claims {
            id: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let jwt = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| AuthError::TokenCreation)?;

        let token = IssuedToken {
            user_id,
            jwt: jwt.clone(),
            ttl_ms: ttl.num_milliseconds(),
            expires_at_ms: expires_at.timestamp_millis(),
        };
        self.active.insert(registry_key(user_id, &jwt), token.clone());
        Ok(token)
    }

    /// Forget a token. Errors are irrelevant here: a token that does not
    /// decode was never registered.
    pub fn revoke(&self, jwt: &str) {
        let mut lenient = self.validation.clone();
        lenient.validate_exp = false;
        if let Ok(data) = decode::<Claims>(jwt, &self.decoding, &lenient) {
            self.active.remove(&registry_key(data.claims.id, jwt));
        }
    }

    fn verify_sync(&self, jwt: &str) -> Result<VerifiedToken, AuthError> {
        let data = decode::<Claims>(jwt, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                // Might be a forged token, reject.
                _ => AuthError::InvalidToken,
            }
        })?;

        let key = registry_key(data.claims.id, jwt);
        let Some(token) = self.active.get(&key).map(|entry| entry.clone()) else {
            // Well-formed but revoked or never issued by us.
            return Err(AuthError::InvalidToken);
        };

        if token.expires_at_ms <= Utc::now().timestamp_millis() {
            drop(self.active.remove(&key));
            return Err(AuthError::ExpiredToken);
        }

        Ok(VerifiedToken {
            user_id: token.user_id,
            ttl_ms: token.ttl_ms,
            expires_at_ms: token.expires_at_ms,
        })
    }
}

#[async_trait]
impl TokenVerifier for TokenService {
    async fn verify(&self, jwt: &str) -> Result<VerifiedToken, AuthError> {
        self.verify_sync(jwt)
    }
}

fn registry_key(user_id: i64, jwt: &str) -> String {
    format!("{user_id}#{jwt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::hours(1))
    }

    #[tokio::test]
    async fn test_issue_then_verify() {
        let tokens = service();
        let issued = tokens.issue(7, None).unwrap();

        let verified = tokens.verify(&issued.jwt).await.unwrap();
        assert_eq!(verified.user_id, 7);
        assert_eq!(verified.expires_at_ms, issued.expires_at_ms);
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let tokens = service();
        let err = tokens.verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_foreign_signature_is_invalid() {
        let theirs = TokenService::new("other-secret", Duration::hours(1));
        let issued = theirs.issue(7, None).unwrap();

        let tokens = service();
        let err = tokens.verify(&issued.jwt).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_revoked_token_is_invalid_not_expired() {
        let tokens = service();
        let issued = tokens.issue(7, None).unwrap();
        tokens.revoke(&issued.jwt);

        let err = tokens.verify(&issued.jwt).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_expired_token_reports_expired() {
        let tokens = service();
        let issued = tokens.issue(7, Some(Duration::seconds(-5))).unwrap();

        let err = tokens.verify(&issued.jwt).await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));
    }

    #[tokio::test]
    async fn test_revoke_tolerates_garbage() {
        let tokens = service();
        tokens.revoke("not-a-jwt");
    }

    #[tokio::test]
    async fn test_tokens_are_per_user() {
        let tokens = service();
        let a = tokens.issue(1, None).unwrap();
        let b = tokens.issue(2, None).unwrap();

        assert_eq!(tokens.verify(&a.jwt).await.unwrap().user_id, 1);
        assert_eq!(tokens.verify(&b.jwt).await.unwrap().user_id, 2);
    }
}
