use crate::domain::errors::DomainResult;
use crate::domain::{Money, PhoneNumber};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 服务商访问令牌（每次推送重新获取，不缓存）
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// STK推送请求参数
#[derive(Debug, Clone, PartialEq)]
pub struct StkPushRequest {
    pub amount: Money,
    pub phone_number: PhoneNumber,
    pub account_reference: String,
    pub transaction_desc: String,
}

/// STK推送同步响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: Option<String>,

    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: Option<String>,

    #[serde(rename = "ResponseCode", default)]
    pub response_code: Option<String>,

    #[serde(rename = "ResponseDescription", default)]
    pub response_description: Option<String>,

    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: Option<String>,

    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,

    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

impl StkPushResponse {
    /// ResponseCode 为 "0" 表示服务商已受理
    pub fn is_accepted(&self) -> bool {
        self.response_code.as_deref() == Some("0")
    }

    /// 失败原因：优先使用服务商的 errorMessage
    pub fn failure_reason(&self) -> String {
        self.error_message
            .clone()
            .or_else(|| self.response_description.clone())
            .unwrap_or_else(|| "Payment request was not accepted".to_string())
    }
}

/// 移动支付服务商端口接口
#[async_trait]
pub trait MobileMoneyPort: Send + Sync {
    /// 使用客户端凭证获取访问令牌
    async fn request_access_token(&self) -> DomainResult<AccessToken>;

    /// 发起STK推送
    async fn stk_push(
        &self,
        token: &AccessToken,
        request: StkPushRequest,
    ) -> DomainResult<StkPushResponse>;
}
