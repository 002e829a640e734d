use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::JwtConfig, error::AppError, state::AppState};

/// Lifetime of every session token.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: i64,    // issued at (unix seconds)
    pub exp: i64,    // expires at (unix seconds)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Signing and verification keys derived from the process-wide `JwtConfig`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> Result<String, AppError> {
        let iat = now.unix_timestamp();
        let claims = Claims {
            sub: user_id,
            iat,
            exp: iat + SESSION_TTL.as_secs() as i64,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("sign session token: {e}")))?;
        debug!(user_id = %user_id, "session token issued");
        Ok(token)
    }

    /// Check signature, issuer, audience and expiry (no leeway).
    pub fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        if token.is_empty() {
            return Err(AppError::InvalidToken);
        }
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Expired,
                _ => AppError::InvalidToken,
            })
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let claims = self.decode_claims(token)?;
        debug!(user_id = %claims.sub, "session token verified");
        Ok(claims.sub)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

/// Authenticated caller, taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Access denied. No token provided.".into()))?;

        // A bare "Bearer" carries an empty token, which fails verification.
        let header = header.trim();
        let token = if header.eq_ignore_ascii_case("bearer") {
            ""
        } else {
            header
                .strip_prefix("Bearer ")
                .or_else(|| header.strip_prefix("bearer "))
                .map(str::trim)
                .ok_or_else(|| {
                    AppError::InvalidArgument(
                        "Authorization header must use the Bearer scheme.".into(),
                    )
                })?
        };

        let keys = JwtKeys::from_ref(state);
        match keys.verify(token) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(e) => {
                warn!(error = %e, "rejected session token");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
        })
    }

    #[test]
    fn issued_token_verifies_to_same_user() {
        let keys = keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn expiry_is_exactly_one_hour_after_issue() {
        let keys = keys("dev-secret");
        let token = keys.issue(Uuid::new_v4()).unwrap();
        let claims = keys.decode_claims(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = keys("dev-secret");
        let two_hours_ago = OffsetDateTime::now_utc() - Duration::from_secs(2 * 60 * 60);
        let token = keys.issue_at(Uuid::new_v4(), two_hours_ago).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Expired)));
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let token = keys("secret-a").issue(Uuid::new_v4()).unwrap();
        assert!(matches!(keys("secret-b").verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn tampered_or_missing_token_is_invalid() {
        let keys = keys("dev-secret");
        let mut token = keys.issue(Uuid::new_v4()).unwrap();
        token.push('x');
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
        assert!(matches!(keys.verify(""), Err(AppError::InvalidToken)));
        assert!(matches!(keys.verify("not.a.jwt"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn wrong_audience_is_invalid() {
        let good = keys("same-secret");
        let other = JwtKeys::new(&JwtConfig {
            secret: "same-secret".into(),
            issuer: "test-issuer".into(),
            audience: "someone-else".into(),
        });
        let token = good.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(other.verify(&token), Err(AppError::InvalidToken)));
    }
}
