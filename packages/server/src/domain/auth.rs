//! Handshake credential verification seam.

use super::{AuthError, UserId};

/// Verifies the bearer credential presented at handshake and resolves the
/// user it belongs to.
#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}
