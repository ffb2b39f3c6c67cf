use thiserror::Error;

/// 领域层错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 金额无效
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// 订单未找到
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// 订单状态错误
    #[error("Invalid order state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// 获取访问令牌失败
    #[error("Upstream authentication failed: {0}")]
    UpstreamAuthError(String),

    /// 服务商拒绝推送请求
    #[error("Payment request failed: {0}")]
    PaymentRequestError(String),

    /// 回调内容格式错误
    #[error("Malformed callback: {0}")]
    MalformedCallback(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// 数据库迁移错误
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// HTTP请求错误
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// 客户端输入导致的错误
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DomainError::ValidationError(_) | DomainError::InvalidAmount(_)
        )
    }

    /// 服务商侧导致的错误（令牌、推送、网络）
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            DomainError::UpstreamAuthError(_)
                | DomainError::PaymentRequestError(_)
                | DomainError::HttpError(_)
        )
    }

    /// 出站请求超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, DomainError::HttpError(e) if e.is_timeout())
    }
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;
