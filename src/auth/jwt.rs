use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// JWT payload: user identity plus the standard timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub email: String, // login key, for consumers that want it without a lookup
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid user for token")]
    InvalidSubject,
    #[error("Failed to sign token")]
    Signing,
}

/// Signing and verification keys, built once from config at startup
/// and carried in application state.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn sign(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        if user_id.is_nil() || email.is_empty() {
            return Err(TokenError::InvalidSubject);
        }
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_owned(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            error!(error = %e, "jwt encode error");
            TokenError::Signing
        })?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Expired tokens are reported as `InvalidToken`, same as a bad
    /// signature or garbage input.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::MissingToken);
        }
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| TokenError::InvalidToken)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Extracts and validates the bearer token, yielding the claims.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Auth("Unauthorized"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Auth("Unauthorized"))?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            ApiError::Auth("Invalid token")
        })?;

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "user@example.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "user@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn sign_rejects_nil_subject() {
        let keys = make_keys();
        let err = keys.sign(Uuid::nil(), "user@example.com").unwrap_err();
        assert_eq!(err, TokenError::InvalidSubject);
    }

    #[test]
    fn sign_rejects_empty_email() {
        let keys = make_keys();
        let err = keys.sign(Uuid::new_v4(), "").unwrap_err();
        assert_eq!(err, TokenError::InvalidSubject);
    }

    #[test]
    fn verify_rejects_empty_token() {
        let keys = make_keys();
        assert_eq!(keys.verify("").unwrap_err(), TokenError::MissingToken);
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys();
        assert_eq!(
            keys.verify("not.a.jwt").unwrap_err(),
            TokenError::InvalidToken
        );
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let other = JwtKeys::new("other-secret", Duration::from_secs(3600));
        let token = keys.sign(Uuid::new_v4(), "user@example.com").expect("sign");
        assert_eq!(other.verify(&token).unwrap_err(), TokenError::InvalidToken);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "user@example.com".into(),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .expect("encode");
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::InvalidToken);
    }
}
