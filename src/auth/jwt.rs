//! Session token signing and verification
//! Stateless HS256 JWT carrying the user identity and role

use crate::{config::AppConfig, error::AppError, models::SessionClaims, models::UserResponse};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;

/// Token failures, kept apart so the middleware can tell expiry from tampering
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid(_) => AppError::InvalidToken,
            TokenError::Signing(msg) => AppError::TokenSigning(msg),
        }
    }
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    /// Create JWT service from a raw secret and a token lifetime
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is accepted only while now <= exp
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Self {
        if config.uses_default_secret() {
            tracing::warn!(
                "JWT secret is not configured, using the built-in default. This is unsafe outside local development"
            );
        }

        Self::new(
            config.security.jwt_secret.expose_secret().as_bytes(),
            config.security.token_ttl_secs,
        )
    }

    /// Token lifetime in seconds (also the cookie max-age)
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a session token for the user, valid for the configured TTL
    pub fn issue(&self, user: &UserResponse) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a session token as if issued at `issued_at`
    pub fn issue_at(
        &self,
        user: &UserResponse,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = SessionClaims {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode session token: {:?}", e);
            TokenError::Signing(e.to_string())
        })
    }

    /// Validate and decode token
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Validate and decode token against an explicit clock.
    ///
    /// A token is valid only while `now < exp`; jsonwebtoken alone still accepts `now == exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Session token expired");
                    TokenError::Expired
                }
                _ => {
                    tracing::debug!("Token validation failed: {:?}", e);
                    TokenError::Invalid(e.to_string())
                }
            })?;

        if claims.exp <= now.timestamp() {
            tracing::debug!("Session token expired");
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
