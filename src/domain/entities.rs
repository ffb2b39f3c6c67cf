use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{Currency, Email, Money, OrderStatus, PhoneNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 订单ID（由存储层分配）
pub type OrderId = i64;

/// 收货信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
}

/// 已校验、尚未入库的订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub phone_number: PhoneNumber,
    pub email: Option<Email>,
    pub amount: Money,
    pub currency: Currency,
    pub shipping: ShippingDetails,
    pub description: Option<String>,
}

impl OrderDraft {
    pub fn new(
        phone_number: PhoneNumber,
        email: Option<Email>,
        amount: Money,
        currency: Currency,
        shipping: ShippingDetails,
        description: Option<String>,
    ) -> DomainResult<Self> {
        if amount.to_cents() <= 0 {
            return Err(DomainError::InvalidAmount(
                "Amount must be greater than 0".to_string(),
            ));
        }

        check_length("first_name", &shipping.first_name, 50)?;
        check_length("last_name", &shipping.last_name, 50)?;
        check_length("address1", &shipping.address1, 200)?;
        check_length("address2", &shipping.address2, 200)?;
        // 服务商限制 TransactionDesc 长度
        check_length("description", &description, 182)?;

        Ok(Self {
            phone_number,
            email,
            amount,
            currency,
            shipping,
            description,
        })
    }
}

fn check_length(field: &str, value: &Option<String>, max: usize) -> DomainResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(DomainError::ValidationError(format!(
            "{}: must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

/// result_desc 列宽
const RESULT_DESC_MAX: usize = 255;

fn clip(desc: Option<String>) -> Option<String> {
    desc.map(|d| d.chars().take(RESULT_DESC_MAX).collect())
}

/// 状态迁移结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 状态已变更
    Applied,
    /// 订单已处于终态，忽略本次迁移
    AlreadyTerminal(OrderStatus),
}

/// 订单实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 订单ID
    pub id: OrderId,

    /// 付款手机号
    pub phone_number: PhoneNumber,

    /// 付款人邮箱
    pub email: Option<Email>,

    /// 金额
    pub amount: Money,

    /// 货币
    pub currency: Currency,

    /// 收货信息
    pub shipping: ShippingDetails,

    /// 交易描述
    pub description: Option<String>,

    /// 订单状态
    pub status: OrderStatus,

    /// 服务商商户请求号
    pub merchant_request_id: Option<String>,

    /// 服务商结账请求号（回调关联用）
    pub checkout_request_id: Option<String>,

    /// M-Pesa 交易收据号
    pub mpesa_receipt_number: Option<String>,

    /// 服务商最近一次返回的描述
    pub result_desc: Option<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// 由存储层分配ID后创建待支付订单
    pub fn pending(id: OrderId, draft: OrderDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            phone_number: draft.phone_number,
            email: draft.email,
            amount: draft.amount,
            currency: draft.currency,
            shipping: draft.shipping,
            description: draft.description,
            status: OrderStatus::Pending,
            merchant_request_id: None,
            checkout_request_id: None,
            mpesa_receipt_number: None,
            result_desc: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 发送给服务商的账户参考号
    pub fn account_reference(&self) -> String {
        self.id.to_string()
    }

    /// 发送给服务商的交易描述
    pub fn transaction_desc(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Payment for Order {}", self.id))
    }

    /// 服务商受理推送：pending -> processing
    pub fn mark_as_processing(
        &mut self,
        checkout_request_id: String,
        merchant_request_id: Option<String>,
        description: Option<String>,
    ) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::InvalidState {
                expected: OrderStatus::Pending.to_string(),
                actual: self.status.to_string(),
            });
        }

        self.status = OrderStatus::Processing;
        self.checkout_request_id = Some(checkout_request_id);
        self.merchant_request_id = merchant_request_id;
        self.result_desc = clip(description);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 回调成功：processing -> confirmed
    pub fn mark_as_confirmed(
        &mut self,
        receipt_number: Option<String>,
        description: Option<String>,
    ) -> DomainResult<Transition> {
        match self.status {
            OrderStatus::Processing => {
                self.status = OrderStatus::Confirmed;
                self.mpesa_receipt_number = receipt_number;
                self.result_desc = clip(description);
                self.updated_at = Utc::now();
                Ok(Transition::Applied)
            }
            OrderStatus::Confirmed | OrderStatus::Failed => {
                Ok(Transition::AlreadyTerminal(self.status))
            }
            OrderStatus::Pending => Err(DomainError::InvalidState {
                expected: OrderStatus::Processing.to_string(),
                actual: self.status.to_string(),
            }),
        }
    }

    /// 推送被拒或回调失败：pending/processing -> failed
    pub fn mark_as_failed(&mut self, reason: Option<String>) -> Transition {
        if self.status.is_terminal() {
            return Transition::AlreadyTerminal(self.status);
        }

        self.status = OrderStatus::Failed;
        if reason.is_some() {
            self.result_desc = clip(reason);
        }
        self.updated_at = Utc::now();
        Transition::Applied
    }

    /// 检查是否已完成（成功或失败）
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> OrderDraft {
        OrderDraft::new(
            PhoneNumber::parse("254700000000").unwrap(),
            Some(Email::parse("jane@example.com").unwrap()),
            Money::from_cents(50000),
            Currency::parse("KES").unwrap(),
            ShippingDetails::default(),
            None,
        )
        .unwrap()
    }

    fn order() -> Order {
        Order::pending(7, draft(), Utc::now())
    }

    #[test]
    fn test_create_pending_order() {
        let order = order();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.account_reference(), "7");
        assert_eq!(order.transaction_desc(), "Payment for Order 7");
        assert!(!order.is_finished());
    }

    #[test]
    fn test_invalid_amount() {
        let result = OrderDraft::new(
            PhoneNumber::parse("254700000000").unwrap(),
            None,
            Money::from_cents(0),
            Currency::parse("KES").unwrap(),
            ShippingDetails::default(),
            None,
        );

        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));
    }

    #[test]
    fn test_overlong_shipping_field() {
        let shipping = ShippingDetails {
            first_name: Some("x".repeat(51)),
            ..Default::default()
        };
        let result = OrderDraft::new(
            PhoneNumber::parse("254700000000").unwrap(),
            None,
            Money::from_cents(100),
            Currency::parse("KES").unwrap(),
            shipping,
            None,
        );

        assert!(matches!(result, Err(DomainError::ValidationError(msg)) if msg.starts_with("first_name")));
    }

    #[test]
    fn test_accepted_then_confirmed() {
        let mut order = order();
        order
            .mark_as_processing("ws_1".to_string(), Some("mr_1".to_string()), None)
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.checkout_request_id.as_deref(), Some("ws_1"));

        let transition = order
            .mark_as_confirmed(Some("QK12ABC".to_string()), Some("ok".to_string()))
            .unwrap();
        assert_eq!(transition, Transition::Applied);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.mpesa_receipt_number.as_deref(), Some("QK12ABC"));
        assert!(order.is_finished());
    }

    #[test]
    fn test_duplicate_confirmation_is_noop() {
        let mut order = order();
        order.mark_as_processing("ws_1".to_string(), None, None).unwrap();
        order.mark_as_confirmed(Some("R1".to_string()), None).unwrap();
        let updated_at = order.updated_at;

        let transition = order.mark_as_confirmed(Some("R2".to_string()), None).unwrap();
        assert_eq!(transition, Transition::AlreadyTerminal(OrderStatus::Confirmed));
        assert_eq!(order.mpesa_receipt_number.as_deref(), Some("R1"));
        assert_eq!(order.updated_at, updated_at);
    }

    #[test]
    fn test_terminal_states_never_regress() {
        let mut confirmed = order();
        confirmed.mark_as_processing("ws_1".to_string(), None, None).unwrap();
        confirmed.mark_as_confirmed(None, None).unwrap();

        assert_eq!(
            confirmed.mark_as_failed(Some("late failure".to_string())),
            Transition::AlreadyTerminal(OrderStatus::Confirmed)
        );
        assert!(confirmed.mark_as_processing("ws_2".to_string(), None, None).is_err());
        assert_eq!(confirmed.status, OrderStatus::Confirmed);

        let mut failed = order();
        assert_eq!(failed.mark_as_failed(Some("rejected".to_string())), Transition::Applied);
        assert_eq!(
            failed.mark_as_confirmed(None, None).unwrap(),
            Transition::AlreadyTerminal(OrderStatus::Failed)
        );
        assert!(failed.mark_as_processing("ws_3".to_string(), None, None).is_err());
        assert_eq!(failed.status, OrderStatus::Failed);
        assert_eq!(failed.result_desc.as_deref(), Some("rejected"));
    }

    #[test]
    fn test_confirm_requires_processing() {
        let mut order = order();
        assert!(matches!(
            order.mark_as_confirmed(None, None),
            Err(DomainError::InvalidState { .. })
        ));
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
