// Authentication - argon2 password hashes and HS256 JWT bearer tokens
// The rest of the crate only sees the `AuthProvider` trait and works with the
// `UserId` it returns.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::AuthConfig;
use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::entity_store::EntityStore;
use crate::models::user::{username_key, User};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// JWT Claims for authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub iat: i64,
    pub exp: i64,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn verify_credentials(&self, username: &str, password: &str) -> AppResult<UserId>;
    fn issue_token(&self, user_id: UserId) -> AppResult<String>;
    async fn verify_token(&self, token: &str) -> AppResult<UserId>;
}

/// Hash password securely using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt = [0u8; 16];
    rand::rng().fill(&mut salt);
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| AppError::Internal(format!("Failed to encode salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify password against stored hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub struct JwtAuthProvider {
    store: EntityStore,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl JwtAuthProvider {
    pub fn new(store: EntityStore, config: &AuthConfig) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_ttl: Duration::hours(config.token_ttl_hours),
        }
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    #[instrument(skip(self, password))]
    async fn verify_credentials(&self, username: &str, password: &str) -> AppResult<UserId> {
        let user = self
            .store
            .find_by_key::<User>(&username_key(username))
            .await?
            .ok_or_else(|| AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            warn!("Failed login for {}", username);
            return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user.id)
    }

    fn issue_token(&self, user_id: UserId) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    #[instrument(skip(self, token))]
    async fn verify_token(&self, token: &str) -> AppResult<UserId> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))?;

        let user_id: UserId = token_data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthenticated("Invalid token subject".to_string()))?;

        // The account must still exist
        if self.store.get::<User>(user_id.value()).await?.is_none() {
            return Err(AppError::Unauthenticated("Unknown user".to_string()));
        }

        debug!("Authenticated user {}", user_id);
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sqlite_database::SqliteDatabase;
    use std::sync::Arc;

    async fn provider_with_user() -> (JwtAuthProvider, UserId) {
        let store = EntityStore::new(Arc::new(SqliteDatabase::new_in_memory().await.unwrap()));
        let user = User::new(UserId(42), "Alice".into(), hash_password("correct horse").unwrap());
        store.insert(&user).await.unwrap();

        let config = AuthConfig {
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 1,
        };
        (JwtAuthProvider::new(store, &config), user.id)
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_credentials_are_case_insensitive_on_username() {
        let (auth, user_id) = provider_with_user().await;

        assert_eq!(auth.verify_credentials("alice", "correct horse").await.unwrap(), user_id);
        let err = auth.verify_credentials("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
        let err = auth.verify_credentials("nobody", "correct horse").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_token_round_trip() {
        let (auth, user_id) = provider_with_user().await;

        let token = auth.issue_token(user_id).unwrap();
        assert_eq!(auth.verify_token(&token).await.unwrap(), user_id);

        let err = auth.verify_token("not-a-token").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let stranger = auth.issue_token(UserId(7)).unwrap();
        assert!(auth.verify_token(&stranger).await.is_err());
    }
}
