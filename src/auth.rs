//! Password hashing, bearer tokens and the authentication middleware.

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken as jwt;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize,
    pub user_id: i32,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Spends one hash verification on a login for an account that does not exist,
/// so unknown usernames cost the same as wrong passwords. Always false.
pub fn reject_unknown_user(password: &str) -> bool {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    if let Some(hash) = DUMMY_HASH.get_or_init(|| hash_password("dummy password").ok()) {
        verify_password(password, hash);
    }
    false
}

/// Issues and checks HS256 access tokens.
pub struct TokenKeys {
    encoding: jwt::EncodingKey,
    decoding: jwt::DecodingKey,
    ttl: chrono::Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: jwt::EncodingKey::from_secret(secret.as_bytes()),
            decoding: jwt::DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::minutes(ttl_minutes),
        }
    }

    pub fn create_token(&self, user_id: i32) -> Result<String, ApiError> {
        let claims = Claims {
            user_id,
            exp: (chrono::Utc::now() + self.ttl).timestamp() as usize,
        };

        jwt::encode(&jwt::Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }

    /// Returns the user id carried by a valid, unexpired token.
    pub fn verify_token(&self, token: &str) -> Result<i32, ApiError> {
        jwt::decode::<Claims>(token, &self.decoding, &jwt::Validation::default())
            .map(|data| data.claims.user_id)
            .map_err(|e| {
                tracing::debug!("rejected token: {}", e);
                ApiError::AuthenticationFailed("Given token not valid for any token type".into())
            })
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(ApiError::NotAuthenticated)?
        .to_str()
        .map_err(|_| ApiError::AuthenticationFailed("Invalid Authorization header.".into()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(ApiError::AuthenticationFailed(
            "Authorization header must contain two space-delimited values".into(),
        )),
    }
}

/// Resolves the bearer token to a live account and stores it in the request extensions.
pub async fn require_authentication(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)?;
    let user_id = state.tokens.verify_token(token)?;

    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::AuthenticationFailed("User not found".into()))?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn password_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();

        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        assert!(!verify_password("correct horse", "not-a-phc-string"));
    }

    #[test]
    fn unknown_user_is_rejected_even_with_the_dummy_password() {
        assert!(!reject_unknown_user("anything"));
        assert!(!reject_unknown_user("dummy password"));
    }

    #[test]
    fn token_round_trips_user_id() {
        let keys = TokenKeys::new("s3cret", 5);
        let token = keys.create_token(17).unwrap();
        assert_eq!(keys.verify_token(&token).unwrap(), 17);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = TokenKeys::new("one", 5).create_token(1).unwrap();
        let err = TokenKeys::new("two", 5).verify_token(&token).unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationFailed(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new("s3cret", -10);
        let token = keys.create_token(1).unwrap();
        assert!(keys.verify_token(&token).is_err());
    }

    #[test]
    fn bearer_scheme_is_required() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(ApiError::NotAuthenticated)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(matches!(bearer_token(&headers), Err(ApiError::AuthenticationFailed(_))));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc");
    }
}
