use crate::domain::errors::{DomainError, DomainResult};
use crate::infrastructure::config::mpesa_config::MpesaConfig;
use crate::ports::mobile_money_port::*;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Local, TimeZone};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// 令牌接口路径
pub const TOKEN_PATH: &str = "/oauth/v1/generate";

/// STK推送接口路径
pub const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";

/// 令牌接口响应
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// 请求时间戳（YYYYMMDDHHMMSS），同一个值用于签名和请求体
pub fn stk_timestamp<Tz: TimeZone>(instant: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.format("%Y%m%d%H%M%S").to_string()
}

/// 请求签名：base64(ShortCode ++ PassKey ++ Timestamp)
pub fn stk_password(short_code: &str, passkey: &str, timestamp: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!(
        "{}{}{}",
        short_code, passkey, timestamp
    ))
}

/// M-Pesa Daraja 适配器实现
#[derive(Clone)]
pub struct DarajaAdapter {
    config: Arc<MpesaConfig>,
    client: Client,
}

impl DarajaAdapter {
    pub fn new(config: Arc<MpesaConfig>) -> DomainResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    /// 构造推送请求体
    fn build_push_body(&self, request: &StkPushRequest, timestamp: &str) -> serde_json::Value {
        let password = stk_password(&self.config.short_code, &self.config.passkey, timestamp);

        json!({
            "BusinessShortCode": self.config.short_code,
            "Password": password,
            "Timestamp": timestamp,
            "TransactionType": self.config.transaction_type,
            "Amount": request.amount.to_provider_amount(),
            "PartyA": request.phone_number.as_str(),
            "PartyB": self.config.short_code,
            "PhoneNumber": request.phone_number.as_str(),
            "CallBackURL": self.config.callback_url,
            "AccountReference": request.account_reference,
            "TransactionDesc": request.transaction_desc,
        })
    }
}

#[async_trait]
impl MobileMoneyPort for DarajaAdapter {
    /// 获取访问令牌
    async fn request_access_token(&self) -> DomainResult<AccessToken> {
        let url = format!("{}{}", self.config.base_url, TOKEN_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[("grant_type", "client_credentials")])
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Token endpoint error: {} - {}", status, body);
            return Err(DomainError::UpstreamAuthError(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Unparsable token response: {}", e);
            DomainError::UpstreamAuthError(format!("Unparsable token response: {}", e))
        })?;

        if token.access_token.is_empty() {
            return Err(DomainError::UpstreamAuthError(
                "Token endpoint returned an empty access_token".to_string(),
            ));
        }

        debug!("Access token acquired");
        Ok(AccessToken::new(token.access_token))
    }

    /// 发起STK推送
    async fn stk_push(
        &self,
        token: &AccessToken,
        request: StkPushRequest,
    ) -> DomainResult<StkPushResponse> {
        let url = format!("{}{}", self.config.base_url, STK_PUSH_PATH);
        let timestamp = stk_timestamp(&Local::now());
        let body = self.build_push_body(&request, &timestamp);

        debug!(
            "STK push for account {} amount {} to {}",
            request.account_reference, request.amount, request.phone_number
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!("STK push response: {} - {}", status, text);

        let parsed = serde_json::from_str::<StkPushResponse>(&text);

        if !status.is_success() {
            // 错误响应通常带 errorMessage，交由上层判定
            return match parsed {
                Ok(rejection) if rejection.error_message.is_some() => Ok(rejection),
                _ => {
                    error!("STK push API error: {} - {}", status, text);
                    Err(DomainError::PaymentRequestError(format!(
                        "Provider returned {}",
                        status
                    )))
                }
            };
        }

        parsed.map_err(|e| {
            error!("Malformed STK push response: {}", e);
            DomainError::PaymentRequestError(format!("Malformed provider response: {}", e))
        })
    }
}
