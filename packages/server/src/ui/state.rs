//! Server state and connection management.

use serde::Deserialize;
use std::sync::Arc;

use crate::{
    config::ServerConfig,
    domain::{RoomRegistry, TokenVerifier},
    infrastructure::{auth::JwtTokenVerifier, repository::InMemoryRoomRegistry},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Handshake credential (alternative to the Authorization header)
    pub token: Option<String>,
}

/// Shared application state, injected into every handler
pub struct AppState {
    /// Room registry（データアクセス層の抽象化）
    pub registry: Arc<dyn RoomRegistry>,
    /// Handshake credential verifier (user tokens)
    pub verifier: Arc<dyn TokenVerifier>,
    /// Service credential verifier for the publish endpoints
    pub publisher: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        verifier: Arc<dyn TokenVerifier>,
        publisher: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            registry,
            verifier,
            publisher,
        }
    }

    /// Build the default in-memory registry and JWT verifiers from configuration
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryRoomRegistry::new(config.room_capacity)),
            Arc::new(JwtTokenVerifier::new(
                config.jwt_secret.as_bytes(),
                config.jwt_issuer.as_deref(),
            )),
            Arc::new(JwtTokenVerifier::new(
                config.publish_secret.as_bytes(),
                config.jwt_issuer.as_deref(),
            )),
        )
    }
}
