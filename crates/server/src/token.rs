use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use patron_core::clock::Clock;
use patron_core::config::AuthConfig;

pub const BEARER_TOKEN_TYPE: &str = "Bearer";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    /// Expiry instant in milliseconds since the Unix epoch.
    pub expires_at_millis: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token verification failed: {0}")]
    Verification(#[source] jsonwebtoken::errors::Error),
    #[error("token lifetime of {0} seconds is out of range")]
    Lifetime(u64),
}

pub trait TokenIssuer: Send + Sync {
    fn generate_token(&self, subject: &str) -> Result<IssuedToken, TokenError>;
}

/// HS256 bearer tokens carrying the customer id as subject.
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtTokenIssuer {
    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let secret = config.secret.expose_secret().as_bytes();
        let seconds = i64::try_from(config.expiration_secs)
            .map_err(|_| TokenError::Lifetime(config.expiration_secs))?;
        let lifetime =
            Duration::try_seconds(seconds).ok_or(TokenError::Lifetime(config.expiration_secs))?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime,
            clock,
        })
    }

    /// Checks signature, issuer, audience and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Verification)
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn generate_token(&self, subject: &str) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now + self.lifetime;

        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken {
            access_token,
            token_type: BEARER_TOKEN_TYPE.to_string(),
            expires_at_millis: expires_at.timestamp_millis(),
        })
    }
}
