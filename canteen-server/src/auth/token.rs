//! HS256 JWT issue/verify

use canteen_core::config::MAX_TOKEN_TTL_HOURS;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::models::Role;

/// Token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id in the table named by `role`
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from one shared secret
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    /// `ttl_hours` is clamped to a year either way so expiry arithmetic
    /// cannot overflow.
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        let ttl_hours = ttl_hours.clamp(-MAX_TOKEN_TTL_HOURS, MAX_TOKEN_TTL_HOURS);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a signed token for `subject`.
    pub fn issue(&self, subject: Uuid, role: Role) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Token)
    }

    /// Verify signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::Token)
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl_hours", &self.ttl.num_hours())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn issue_then_verify() {
        let keys = TokenKeys::new(SECRET, 1);
        let id = Uuid::new_v4();

        let token = keys.issue(id, Role::Staff).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Staff);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn rejects_other_secret() {
        let token = TokenKeys::new(SECRET, 1).issue(Uuid::new_v4(), Role::User).unwrap();
        let other = TokenKeys::new(b"ffffffffffffffffffffffffffffffff", 1);
        assert!(matches!(other.verify(&token), Err(AuthError::Token(_))));
    }

    #[test]
    fn rejects_expired() {
        // Well past the default 60s leeway
        let keys = TokenKeys::new(SECRET, -1);
        let token = keys.issue(Uuid::new_v4(), Role::User).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn huge_ttl_is_capped() {
        let keys = TokenKeys::new(SECRET, i64::MAX);
        let token = keys.issue(Uuid::new_v4(), Role::Admin).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_TTL_HOURS * 3600);
    }

    #[test]
    fn rejects_garbage() {
        let keys = TokenKeys::new(SECRET, 1);
        assert!(keys.verify("not.a.jwt").is_err());
    }
}
