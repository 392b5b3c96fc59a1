//! Signed session tokens.
//!
//! A token names the account it was issued to and expires after the configured
//! lifetime. The server only trusts the account id; the username is informative.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuthError, AuthResult, DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_JWT_ISSUER};

/// Payload of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    /// Username when the token was issued.
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    /// Unique per token.
    pub jti: String,
}

impl Claims {
    /// Claims for a session of `user_id` starting now.
    pub fn new(user_id: Uuid, username: String, issuer: &str, lifetime_hours: u64) -> Self {
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::hours(lifetime_hours as i64);

        Self {
            sub: user_id.to_string(),
            username,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: issuer.to_string(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// The account the token was issued to.
    pub fn user_id(&self) -> AuthResult<Uuid> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Signing secret, session lifetime and issuer name.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Session lifetime in hours.
    pub expiration_hours: u64,
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[redacted]")
            .field("expiration_hours", &self.expiration_hours)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Seven-day sessions issued as `sortie`.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            issuer: DEFAULT_JWT_ISSUER.to_string(),
        }
    }

    pub fn with_expiration_hours(mut self, hours: u64) -> Self {
        self.expiration_hours = hours;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

/// Issues and checks session tokens with an HMAC secret.
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let secret = config.secret.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            config,
        }
    }

    /// Issues a session token for a signed-in user.
    pub fn generate_token(&self, user_id: Uuid, username: String) -> AuthResult<String> {
        let claims = Claims::new(
            user_id,
            username,
            &self.config.issuer,
            self.config.expiration_hours,
        );

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::JwtEncoding(e.to_string()))
    }

    /// Checks signature, expiry and issuer of a presented token.
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-must-be-long-enough-for-security";

    #[test]
    fn test_jwt_generation_and_validation() {
        let manager = JwtManager::new(JwtConfig::new(SECRET));
        let user_id = Uuid::new_v4();

        let token = manager.generate_token(user_id, "alice".to_string()).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user_id);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.iss, DEFAULT_JWT_ISSUER);
        assert!(claims.exp > Utc::now().timestamp());
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(JwtConfig::new(SECRET));

        let result = manager.validate_token("invalid-token");
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_wrong_secret() {
        let manager1 = JwtManager::new(JwtConfig::new("secret-one-must-be-long-enough"));
        let manager2 = JwtManager::new(JwtConfig::new("secret-two-must-be-long-enough"));

        let token = manager1
            .generate_token(Uuid::new_v4(), "bob".to_string())
            .unwrap();

        assert!(manager2.validate_token(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let manager = JwtManager::new(JwtConfig::new(SECRET));
        let mut claims = Claims::new(Uuid::new_v4(), "carol".to_string(), DEFAULT_JWT_ISSUER, 1);
        claims.iat -= 7200;
        claims.exp -= 7200;
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            manager.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_issuer() {
        let issuer = JwtManager::new(JwtConfig::new(SECRET).with_issuer("someone-else"));
        let manager = JwtManager::new(JwtConfig::new(SECRET));

        let token = issuer
            .generate_token(Uuid::new_v4(), "dave".to_string())
            .unwrap();

        assert!(manager.validate_token(&token).is_err());
    }
}
