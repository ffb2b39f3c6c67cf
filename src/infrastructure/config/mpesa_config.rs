use crate::domain::errors::{DomainError, DomainResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Daraja 沙箱地址
pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";

/// M-Pesa (Daraja) 配置
#[derive(Clone)]
pub struct MpesaConfig {
    /// API基础URL
    pub base_url: String,

    /// Consumer Key
    pub consumer_key: String,

    /// Consumer Secret
    pub consumer_secret: String,

    /// 商户短码
    pub short_code: String,

    /// Lipa Na M-Pesa Passkey
    pub passkey: String,

    /// 服务商回调地址
    pub callback_url: String,

    /// 交易类型（PayBill 或 Till）
    pub transaction_type: String,

    /// 结算货币
    pub currency: String,

    /// 出站请求超时
    pub request_timeout: Duration,
}

impl MpesaConfig {
    pub fn from_env() -> DomainResult<Arc<Self>> {
        Self::from_lookup(|name| std::env::var(name).ok()).map(Arc::new)
    }

    /// 从任意键值来源读取配置
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DomainError::ConfigurationError(format!("{} must be set", name)))
        };

        let request_timeout = match lookup("MPESA_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                DomainError::ConfigurationError(format!(
                    "MPESA_REQUEST_TIMEOUT_SECS must be a number of seconds, got {:?}",
                    raw
                ))
            })?,
            None => 30,
        };

        Ok(Self {
            base_url: lookup("MPESA_BASE_URL")
                .unwrap_or_else(|| SANDBOX_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            consumer_key: required("MPESA_CONSUMER_KEY")?,
            consumer_secret: required("MPESA_CONSUMER_SECRET")?,
            short_code: required("MPESA_SHORTCODE")?,
            passkey: required("MPESA_PASSKEY")?,
            callback_url: required("MPESA_CALLBACK_URL")?,
            transaction_type: lookup("MPESA_TRANSACTION_TYPE")
                .unwrap_or_else(|| "CustomerPayBillOnline".to_string()),
            currency: lookup("MPESA_CURRENCY").unwrap_or_else(|| "KES".to_string()),
            request_timeout: Duration::from_secs(request_timeout),
        })
    }
}

impl fmt::Debug for MpesaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpesaConfig")
            .field("base_url", &self.base_url)
            .field("consumer_key", &"***")
            .field("consumer_secret", &"***")
            .field("short_code", &self.short_code)
            .field("passkey", &"***")
            .field("callback_url", &self.callback_url)
            .field("transaction_type", &self.transaction_type)
            .field("currency", &self.currency)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
