//! Credential verification implementations.

pub mod jwt;

pub use jwt::{JwtClaims, JwtTokenVerifier, extract_bearer_token};
