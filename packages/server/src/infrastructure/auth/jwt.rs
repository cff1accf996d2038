//! JWT verification for the WebSocket handshake and the publish endpoints.
//!
//! Tokens are issued by the external authentication service; this module only
//! validates them. The `sub` claim is the TaskMe user id.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, TokenVerifier, UserId};

const BEARER_PREFIX: &str = "Bearer ";

/// JWT claims issued by the TaskMe authentication service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// User identifier
    pub sub: String,
    /// Expiration (Unix seconds)
    pub exp: u64,
    /// Issued at (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// HS256 token verifier
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    /// Create a verifier for tokens signed with `secret`.
    ///
    /// When `issuer` is set, tokens from any other issuer are rejected.
    pub fn new(secret: &[u8], issuer: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
                _ => AuthError::ValidationFailed(e.to_string()),
            },
        )?;

        let user_id = UserId::new(data.claims.sub).map_err(|e| {
            tracing::warn!("Token subject rejected: {}", e);
            AuthError::InvalidSubject(e)
        })?;
        tracing::debug!(user_id = %user_id, "Token validated");
        Ok(user_id)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
