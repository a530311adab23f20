// Password hashing, token signing and the request extractors built on them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::AppState;
use crate::config::AuthConfig;
use crate::error::ApiError;

/// Name of the cookie that carries the CMS session.
pub const ADMIN_COOKIE: &str = "jwt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Token role {0:?} not accepted here")]
    WrongRole(Role),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!("Rejected credentials: {}", err);
        ApiError::unauthorized("Dont have access")
    }
}

#[derive(Clone)]
pub struct TokenService {
    secret: String,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            ttl: config.token_ttl,
        }
    }

    pub fn issue(&self, id: i32, email: &str, role: Role) -> Result<String, ApiError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow::anyhow!("System clock before UNIX epoch: {}", e))?
            .as_secs();

        let claims = Claims {
            id,
            email: email.to_string(),
            role,
            iat,
            exp: iat + self.ttl.as_secs(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.secret.as_bytes()))
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    pub fn verify(&self, token: &str, role: Role) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        if data.claims.role != role {
            return Err(AuthError::WrongRole(data.claims.role));
        }

        Ok(data.claims)
    }
}

/// bcrypt on the blocking pool, so hashing never stalls the reactor.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> Result<String, ApiError> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Hashing task failed: {}", e))?
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
    }

    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        let password = password.to_string();
        let hash = hash.to_string();

        let verdict = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Verification task failed: {}", e))?;

        Ok(verdict.unwrap_or_else(|e| {
            tracing::warn!("Stored password hash could not be checked: {}", e);
            false
        }))
    }
}

/// CMS session cookie: HttpOnly, one day, Secure outside local development.
pub fn admin_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(1))
        .build()
}

pub fn expired_admin_cookie() -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE, "")).path("/").build()
}

/// A mobile user authenticated by `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::MissingToken)?;

        let claims = state.tokens.verify(bearer.token(), Role::User)?;
        Ok(AuthUser(claims))
    }
}

/// A CMS operator authenticated by the `jwt` cookie.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);

        let cookie = jar.get(ADMIN_COOKIE).ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

        let claims = state
            .tokens
            .verify(cookie.value(), Role::Admin)
            .map_err(|e| {
                tracing::debug!("Rejected admin session: {}", e);
                ApiError::unauthorized("Unauthorized")
            })?;

        Ok(AdminSession(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn service() -> TokenService {
        TokenService::new(&AuthConfig {
            secret: "a-test-secret-that-is-long".to_string(),
            token_ttl: Duration::from_secs(3600),
            bcrypt_cost: 4,
        })
    }

    #[test]
    fn test_issue_and_verify_token() {
        let tokens = service();
        let token = tokens.issue(42, "budi@example.com", Role::User).unwrap();

        let claims = tokens.verify(&token, Role::User).unwrap();
        assert_eq!(claims.id, 42);
        assert_eq!(claims.email, "budi@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_role_is_enforced() {
        let tokens = service();
        let user_token = tokens.issue(1, "budi@example.com", Role::User).unwrap();

        assert!(matches!(tokens.verify(&user_token, Role::Admin), Err(AuthError::WrongRole(Role::User))));
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let other = TokenService::new(&AuthConfig {
            secret: "some-other-secret-entirely".to_string(),
            token_ttl: Duration::from_secs(3600),
            bcrypt_cost: 4,
        });
        let token = other.issue(1, "budi@example.com", Role::User).unwrap();

        assert_err!(service().verify(&token, Role::User));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims {
            id: 1,
            email: "budi@example.com".to_string(),
            role: Role::User,
            iat: 1_000_000,
            exp: 1_000_100,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("a-test-secret-that-is-long".as_bytes()),
        )
        .unwrap();

        assert!(matches!(service().verify(&token, Role::User), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_admin_cookie_attributes() {
        let cookie = admin_cookie("token".to_string(), true);

        assert_eq!(cookie.name(), ADMIN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(1)));
    }

    #[tokio::test]
    async fn test_hash_and_verify_password() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("hunter22").await.unwrap();

        assert!(hash.starts_with("$2"));
        assert!(assert_ok!(hasher.verify("hunter22", &hash).await));
        assert!(!assert_ok!(hasher.verify("hunter23", &hash).await));
    }

    #[tokio::test]
    async fn test_malformed_hash_is_a_mismatch() {
        let hasher = PasswordHasher::new(4);
        assert!(!hasher.verify("hunter22", "not-a-bcrypt-hash").await.unwrap());
    }
}
