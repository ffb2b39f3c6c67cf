use crate::domain::errors::{DomainError, DomainResult};

/// 服务监听与存储配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 未设置时使用内存存储
    pub database_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> DomainResult<Self> {
        let port = std::env::var("SERVER_PORT").unwrap_or_else(|_| "3000".to_string());

        Ok(Self {
            host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: port.parse().map_err(|_| {
                DomainError::ConfigurationError(format!("SERVER_PORT is not a port: {:?}", port))
            })?,
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
