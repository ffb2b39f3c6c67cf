use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Acknowledgement, OrderStatus, StkCallback, Transition};
use crate::ports::OrderRepositoryPort;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// 回调处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// 订单状态已更新
    Updated(OrderStatus),
    /// 订单已处于终态（重复或乱序回调）
    Unchanged(OrderStatus),
    /// 找不到对应订单
    UnknownCheckout,
}

/// 回调关联服务：把服务商的异步结果落到订单上
pub struct CallbackService<R: OrderRepositoryPort> {
    repository: Arc<R>,
}

impl<R: OrderRepositoryPort> CallbackService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// 处理回调。结构错误返回 ResultCode 1，其余情况一律确认接收
    pub async fn handle_callback(&self, payload: &Value) -> Acknowledgement {
        let callback = match StkCallback::from_payload(payload) {
            Ok(callback) => callback,
            Err(e) => {
                warn!("Rejecting callback: {}; payload: {}", e, payload);
                return Acknowledgement::rejected(e.to_string());
            }
        };

        match self.reconcile(&callback).await {
            Ok(Reconciliation::UnknownCheckout) => {
                warn!(
                    "Callback for unknown checkout request {}: merchant request {:?}, result {} ({}), receipt {:?}; reconcile manually",
                    callback.checkout_request_id,
                    callback.merchant_request_id,
                    callback.result_code,
                    callback.result_desc,
                    callback.receipt_number
                );
            }
            Ok(outcome) => {
                info!(
                    "Callback {} reconciled: {:?}",
                    callback.checkout_request_id, outcome
                );
            }
            Err(e) => {
                error!(
                    "Failed to reconcile callback {}: {}",
                    callback.checkout_request_id, e
                );
            }
        }

        Acknowledgement::accepted()
    }

    /// 查找订单并应用回调结果
    pub async fn reconcile(&self, callback: &StkCallback) -> DomainResult<Reconciliation> {
        let Some(mut order) = self
            .repository
            .find_by_checkout_request_id(&callback.checkout_request_id)
            .await?
        else {
            return Ok(Reconciliation::UnknownCheckout);
        };

        let expected = order.status;
        let description = Some(callback.result_desc.clone()).filter(|d| !d.is_empty());

        let transition = if callback.is_success() {
            order.mark_as_confirmed(callback.receipt_number.clone(), description)?
        } else {
            order.mark_as_failed(description)
        };

        if let Transition::AlreadyTerminal(status) = transition {
            if (status == OrderStatus::Confirmed) != callback.is_success() {
                warn!(
                    "Order {} is already {}, ignoring callback result {}",
                    order.id, status, callback.result_code
                );
            }
            return Ok(Reconciliation::Unchanged(status));
        }

        if self.repository.update(&order, expected).await? {
            return Ok(Reconciliation::Updated(order.status));
        }

        // 并发的重复回调抢先写入，以存储中的状态为准
        let current = self
            .repository
            .find_by_id(order.id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(order.id.to_string()))?;
        Ok(Reconciliation::Unchanged(current.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Currency, Money, OrderDraft, PhoneNumber, ShippingDetails};
    use crate::infrastructure::InMemoryOrderRepository;
    use serde_json::json;

    async fn processing_order(repository: &InMemoryOrderRepository, checkout: &str) -> i64 {
        let draft = OrderDraft::new(
            PhoneNumber::parse("254700000000").unwrap(),
            None,
            Money::from_cents(50000),
            Currency::parse("KES").unwrap(),
            ShippingDetails::default(),
            None,
        )
        .unwrap();
        let mut order = repository.create(draft).await.unwrap();
        order
            .mark_as_processing(checkout.to_string(), None, None)
            .unwrap();
        assert!(repository.update(&order, OrderStatus::Pending).await.unwrap());
        order.id
    }

    fn callback(checkout: &str, code: i64, desc: &str) -> Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "mr_1",
                    "CheckoutRequestID": checkout,
                    "ResultCode": code,
                    "ResultDesc": desc,
                    "CallbackMetadata": {
                        "Item": [
                            { "Name": "Amount", "Value": 500 },
                            { "Name": "MpesaReceiptNumber", "Value": "QKX1234ABC" }
                        ]
                    }
                }
            }
        })
    }

    async fn status_of(repository: &InMemoryOrderRepository, id: i64) -> OrderStatus {
        repository.find_by_id(id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_success_callback_confirms_order() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let id = processing_order(&repository, "ws_1").await;
        let service = CallbackService::new(repository.clone());

        let ack = service
            .handle_callback(&callback("ws_1", 0, "The service request is processed successfully."))
            .await;

        assert_eq!(ack, Acknowledgement::accepted());
        let order = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.mpesa_receipt_number.as_deref(), Some("QKX1234ABC"));
    }

    #[tokio::test]
    async fn test_cancelled_callback_fails_order() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let id = processing_order(&repository, "ws_1").await;
        let service = CallbackService::new(repository.clone());

        let ack = service
            .handle_callback(&callback("ws_1", 1032, "Request cancelled by user"))
            .await;

        assert_eq!(ack.result_code, 0);
        let order = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert_eq!(order.result_desc.as_deref(), Some("Request cancelled by user"));
    }

    #[tokio::test]
    async fn test_duplicate_callback_is_idempotent() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let id = processing_order(&repository, "ws_1").await;
        let service = CallbackService::new(repository.clone());
        let payload = callback("ws_1", 0, "ok");

        assert_eq!(service.handle_callback(&payload).await.result_code, 0);
        let first = repository.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(service.handle_callback(&payload).await.result_code, 0);
        let second = repository.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(second.status, OrderStatus::Confirmed);
        assert_eq!(first, second);
        assert_eq!(
            service
                .reconcile(&StkCallback::from_payload(&payload).unwrap())
                .await
                .unwrap(),
            Reconciliation::Unchanged(OrderStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn test_late_failure_does_not_override_confirmation() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let id = processing_order(&repository, "ws_1").await;
        let service = CallbackService::new(repository.clone());

        service.handle_callback(&callback("ws_1", 0, "ok")).await;
        let ack = service.handle_callback(&callback("ws_1", 1, "late")).await;

        assert_eq!(ack.result_code, 0);
        assert_eq!(status_of(&repository, id).await, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_late_success_does_not_override_failure() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let id = processing_order(&repository, "ws_1").await;
        let service = CallbackService::new(repository.clone());

        service.handle_callback(&callback("ws_1", 1037, "timeout")).await;
        service.handle_callback(&callback("ws_1", 0, "ok")).await;

        assert_eq!(status_of(&repository, id).await, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_malformed_callback_is_rejected_without_side_effects() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let id = processing_order(&repository, "ws_1").await;
        let service = CallbackService::new(repository.clone());

        for payload in [
            json!({}),
            json!({ "Body": { "callback": {} } }),
            json!({ "Body": { "stkCallback": { "ResultCode": 0 } } }),
            json!(42),
        ] {
            let ack = service.handle_callback(&payload).await;
            assert_eq!(ack.result_code, 1, "{}", payload);
        }

        assert_eq!(status_of(&repository, id).await, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_callback_before_checkout_is_recorded_leaves_order_untouched() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let draft = OrderDraft::new(
            PhoneNumber::parse("254700000000").unwrap(),
            None,
            Money::from_cents(50000),
            Currency::parse("KES").unwrap(),
            ShippingDetails::default(),
            None,
        )
        .unwrap();
        let order = repository.create(draft).await.unwrap();
        let service = CallbackService::new(repository.clone());

        let payload = callback("ws_early", 0, "ok");
        assert_eq!(service.handle_callback(&payload).await, Acknowledgement::accepted());
        assert_eq!(
            service
                .reconcile(&StkCallback::from_payload(&payload).unwrap())
                .await
                .unwrap(),
            Reconciliation::UnknownCheckout
        );
        assert_eq!(status_of(&repository, order.id).await, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_checkout_is_acknowledged() {
        let repository = Arc::new(InMemoryOrderRepository::new());
        let service = CallbackService::new(repository.clone());

        let ack = service.handle_callback(&callback("ws_missing", 0, "ok")).await;
        assert_eq!(ack.result_code, 0);
        assert_eq!(
            service
                .reconcile(&StkCallback::from_payload(&callback("ws_missing", 0, "ok")).unwrap())
                .await
                .unwrap(),
            Reconciliation::UnknownCheckout
        );
    }
}
