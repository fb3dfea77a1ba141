//! Session token verification for the hosted auth provider.
//!
//! The auth provider issues short-lived RS256 session JWTs. This backend never
//! mints tokens; it only verifies them and trusts the `sub` claim as the
//! caller's user id.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (auth provider user id, e.g. `user_2abc...`)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    #[serde(default)]
    pub iat: Option<i64>,
    /// Issuer (the auth provider frontend API URL)
    #[serde(default)]
    pub iss: Option<String>,
    /// Session id
    #[serde(default)]
    pub sid: Option<String>,
    /// Primary email, present when the session token template adds it
    #[serde(default)]
    pub email: Option<String>,
    /// Active organization id
    #[serde(default)]
    pub org_id: Option<String>,
}

/// Verifies session tokens against the provider's public key.
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: Option<String>,
    leeway_secs: u64,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.leeway_secs)
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

impl SessionVerifier {
    /// Creates a verifier from the provider's RSA public key in PEM format.
    pub fn from_rsa_pem(
        public_key_pem: &str,
        issuer: Option<String>,
        leeway_secs: u64,
    ) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            decoding_key,
            algorithm: Algorithm::RS256,
            issuer,
            leeway_secs,
        })
    }

    /// Creates an HS256 verifier from a shared secret.
    ///
    /// Only meant for local development and tests, where no provider key pair
    /// is available.
    pub fn from_secret(secret: &str, issuer: Option<String>) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            issuer,
            leeway_secs: 0,
        }
    }

    /// Validates a token and returns its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = self.leeway_secs;
        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data =
            decode::<SessionClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                    jsonwebtoken::errors::ErrorKind::InvalidToken
                    | jsonwebtoken::errors::ErrorKind::InvalidSignature
                    | jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidToken,
                    _ => JwtError::DecodingError(e.to_string()),
                }
            })?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(JwtError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}
