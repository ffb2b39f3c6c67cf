use crate::domain::errors::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// STK推送异步回调的有效内容（Body.stkCallback）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StkCallback {
    pub merchant_request_id: Option<String>,
    pub checkout_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
    pub receipt_number: Option<String>,
}

impl StkCallback {
    /// 从任意JSON中提取回调，结构不符时返回 MalformedCallback
    pub fn from_payload(payload: &Value) -> DomainResult<Self> {
        let callback = payload
            .get("Body")
            .and_then(|body| body.get("stkCallback"))
            .filter(|cb| cb.is_object())
            .ok_or_else(|| DomainError::MalformedCallback("missing Body.stkCallback".to_string()))?;

        let result_code = match callback.get("ResultCode") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            DomainError::MalformedCallback("ResultCode missing or not an integer".to_string())
        })?;

        let checkout_request_id = callback
            .get("CheckoutRequestID")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DomainError::MalformedCallback("CheckoutRequestID missing".to_string()))?
            .to_string();

        let result_desc = callback
            .get("ResultDesc")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let merchant_request_id = callback
            .get("MerchantRequestID")
            .and_then(Value::as_str)
            .map(String::from);

        Ok(Self {
            merchant_request_id,
            checkout_request_id,
            result_code,
            result_desc,
            receipt_number: metadata_item(callback, "MpesaReceiptNumber"),
        })
    }

    /// 业务结果是否成功
    pub fn is_success(&self) -> bool {
        self.result_code == 0
    }
}

/// CallbackMetadata.Item 中按名称取值
fn metadata_item(callback: &Value, name: &str) -> Option<String> {
    callback
        .get("CallbackMetadata")?
        .get("Item")?
        .as_array()?
        .iter()
        .find(|item| item.get("Name").and_then(Value::as_str) == Some(name))?
        .get("Value")
        .and_then(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// 返回给服务商的确认（ResultCode 表示回调是否被接收，而非支付结果）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl Acknowledgement {
    pub fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Accepted".to_string(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            result_code: 1,
            result_desc: reason.into(),
        }
    }
}
