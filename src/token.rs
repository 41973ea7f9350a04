//! Claims codec for the session token.
//! Signs a claims payload into a compact three-segment HS256 token and
//! verifies/decodes it back, rejecting tampered, expired, or malformed input
//! with a tagged error. Pure over the token string and the process-wide
//! secret key; no side effects.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::UserData;

/// Fixed session lifetime: one minute from issue, regardless of the caller.
pub const SESSION_TTL_SECS: i64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("claims serialization failed: {0}")]
    Serialize(String),
}

/// Payload carried inside the signed token.
///
/// `exp` is the registered claim that verification enforces; `expires` mirrors
/// it for the cookie `Expires` attribute. The codec sets both from the same
/// instant so they cannot diverge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub user: UserData,
    pub expires: DateTime<Utc>,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token together with its expiry instant.
#[derive(Debug, Clone)]
pub struct SignedSession {
    pub token: String,
    pub expires: DateTime<Utc>,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Read the signing secret from `AKUN_SECRET_KEY`. Absence is fatal at
    /// startup: without the key no session can ever verify.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = std::env::var("AKUN_SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("AKUN_SECRET_KEY is not set; refusing to start without a signing key"))?;
        Ok(Self::new(&secret))
    }

    /// Sign the user record into a session token expiring one minute from now.
    pub fn sign(&self, user: &UserData) -> Result<SignedSession, TokenError> {
        self.sign_expiring_at(user, Utc::now() + Duration::seconds(SESSION_TTL_SECS))
    }

    /// Issuance seam with an explicit expiry instant.
    pub fn sign_expiring_at(&self, user: &UserData, expires: DateTime<Utc>) -> Result<SignedSession, TokenError> {
        let claims = Claims {
            user: user.clone(),
            expires,
            iat: Utc::now().timestamp(),
            exp: expires.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Serialize(e.to_string()))?;
        Ok(SignedSession { token, expires })
    }

    /// Verify signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Default leeway is 60s, which would swallow the entire TTL.
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })?;
        Ok(data.claims)
    }
}
