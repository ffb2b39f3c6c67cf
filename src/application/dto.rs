use crate::domain::value_objects::{AmountInput, PhoneInput};
use crate::domain::{Order, OrderId};
use serde::{Deserialize, Serialize};

/// 下单请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// 付款手机号（数字或字符串）
    #[serde(alias = "phone", alias = "phone_number")]
    pub mpesa_number: Option<PhoneInput>,

    /// 付款人邮箱
    pub email: Option<String>,

    /// 金额（数字或 "KSH 1,200.50" 形式）
    #[serde(alias = "total_amount")]
    pub amount: Option<AmountInput>,

    /// 货币代码，缺省为配置的结算货币
    pub currency: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,

    /// 交易描述
    pub description: Option<String>,
}

/// 推送已受理的订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderHandle {
    pub order_id: OrderId,
    pub checkout_request_id: String,
}

/// 下单响应
#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub message: String,
    pub order_id: OrderId,
    pub checkout_request_id: String,
}

impl From<OrderHandle> for PlaceOrderResponse {
    fn from(handle: OrderHandle) -> Self {
        Self {
            message: "Payment processing".to_string(),
            order_id: handle.order_id,
            checkout_request_id: handle.checkout_request_id,
        }
    }
}

/// 订单状态响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusResponse {
    pub order_id: OrderId,
    pub amount: f64,
    pub currency: String,
    pub payment_status: String,
}

impl From<&Order> for OrderStatusResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            amount: order.amount.to_major(),
            currency: order.currency.to_string(),
            payment_status: order.status.to_string(),
        }
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: String, error: String) -> Self {
        Self { error, code }
    }
}
