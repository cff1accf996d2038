//! Server configuration (command line flags with environment fallbacks).

use std::net::SocketAddr;

use clap::Parser;

use crate::{domain::DEFAULT_ROOM_CAPACITY, ui::ServerError};

/// TaskMe realtime relay server
#[derive(Debug, Clone, Parser)]
#[command(name = "taskme-server", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "TASKME_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TASKME_PORT", default_value_t = 8080)]
    pub port: u16,

    /// HS256 secret shared with the authentication service
    #[arg(long, env = "TASKME_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// HS256 secret for service tokens accepted by the publish endpoints
    #[arg(long, env = "TASKME_PUBLISH_SECRET", hide_env_values = true)]
    pub publish_secret: String,

    /// Required `iss` claim, if any
    #[arg(long, env = "TASKME_JWT_ISSUER")]
    pub jwt_issuer: Option<String>,

    /// Maximum connections per task room
    #[arg(long, env = "TASKME_ROOM_CAPACITY", default_value_t = DEFAULT_ROOM_CAPACITY)]
    pub room_capacity: usize,

    /// Default log level when RUST_LOG is not set
    #[arg(long, env = "TASKME_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Configuration for tests and embedding, with defaults for everything
    /// but the secrets.
    pub fn with_secrets(jwt_secret: impl Into<String>, publish_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: jwt_secret.into(),
            publish_secret: publish_secret.into(),
            jwt_issuer: None,
            room_capacity: DEFAULT_ROOM_CAPACITY,
            log_level: "info".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.jwt_secret.is_empty() {
            return Err(ServerError::Config("jwt secret must not be empty".to_string()));
        }
        if self.publish_secret.is_empty() {
            return Err(ServerError::Config(
                "publish secret must not be empty".to_string(),
            ));
        }
        if self.publish_secret == self.jwt_secret {
            return Err(ServerError::Config(
                "publish secret must differ from the jwt secret".to_string(),
            ));
        }
        if self.room_capacity == 0 {
            return Err(ServerError::Config(
                "room capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        // テスト項目: コマンドライン引数から設定を読み込める
        // when (操作):
        let config = ServerConfig::try_parse_from([
            "taskme-server",
            "--port",
            "9000",
            "--jwt-secret",
            "s3cret",
            "--publish-secret",
            "service",
            "--room-capacity",
            "5",
        ])
        .unwrap();

        // then (期待する結果):
        assert_eq!(config.port, 9000);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.publish_secret, "service");
        assert_eq!(config.room_capacity, 5);
        assert_eq!(config.jwt_issuer, None);
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
    }

    #[test]
    fn test_validate_rejects_empty_secret_and_zero_capacity() {
        // テスト項目: 空の秘密鍵と容量 0 は設定エラー
        // given (前提条件):
        let empty_secret = ServerConfig::with_secrets("", "service");
        let mut zero_capacity = ServerConfig::with_secrets("s3cret", "service");
        zero_capacity.room_capacity = 0;

        // then (期待する結果):
        assert!(matches!(empty_secret.validate(), Err(ServerError::Config(_))));
        assert!(matches!(zero_capacity.validate(), Err(ServerError::Config(_))));
        assert!(ServerConfig::with_secrets("s3cret", "service").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_or_shared_publish_secret() {
        // テスト項目: 公開用の秘密鍵は空やユーザー用と同じ値を許さない
        // given (前提条件):
        let empty = ServerConfig::with_secrets("s3cret", "");
        let shared = ServerConfig::with_secrets("s3cret", "s3cret");

        // then (期待する結果):
        assert!(matches!(empty.validate(), Err(ServerError::Config(_))));
        assert!(matches!(shared.validate(), Err(ServerError::Config(_))));
    }

    #[test]
    fn test_invalid_host() {
        // テスト項目: 不正なホストは bind_addr でエラー
        // given (前提条件):
        let mut config = ServerConfig::with_secrets("s3cret", "service");
        config.host = "not a host".to_string();

        // then (期待する結果):
        assert!(config.bind_addr().is_err());
    }
}
