use crate::application::dto::{OrderHandle, OrderStatusResponse, PlaceOrderRequest};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{
    Currency, Email, Money, Order, OrderDraft, OrderId, OrderStatus, PhoneInput, PhoneNumber,
    ShippingDetails,
};
use crate::ports::{MobileMoneyPort, OrderRepositoryPort, StkPushRequest, StkPushResponse};
use std::sync::Arc;
use tracing::{debug, error, info};

/// 支付服务：创建订单并向服务商发起STK推送
pub struct PaymentService<M: MobileMoneyPort, R: OrderRepositoryPort> {
    mobile_money: Arc<M>,
    repository: Arc<R>,
    currency: Currency,
}

impl<M: MobileMoneyPort, R: OrderRepositoryPort> PaymentService<M, R> {
    pub fn new(mobile_money: Arc<M>, repository: Arc<R>, currency: Currency) -> Self {
        Self {
            mobile_money,
            repository,
            currency,
        }
    }

    /// 校验请求并生成订单草稿
    fn build_draft(&self, request: PlaceOrderRequest) -> DomainResult<OrderDraft> {
        let phone_number = request
            .mpesa_number
            .as_ref()
            .map(PhoneInput::to_text)
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| DomainError::ValidationError("mpesa_number: is required".to_string()))
            .and_then(|p| PhoneNumber::parse(&p))?;

        let amount = request
            .amount
            .as_ref()
            .ok_or_else(|| DomainError::ValidationError("amount: is required".to_string()))
            .and_then(Money::parse)?;

        let email = request
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .map(Email::parse)
            .transpose()?;

        let currency = match request.currency.as_deref() {
            Some(raw) => Currency::parse(raw)?,
            None => self.currency.clone(),
        };
        if currency != self.currency {
            return Err(DomainError::ValidationError(format!(
                "currency: only {} is accepted for mobile money payments",
                self.currency
            )));
        }

        OrderDraft::new(
            phone_number,
            email,
            amount,
            currency,
            ShippingDetails {
                first_name: request.first_name,
                last_name: request.last_name,
                address1: request.address1,
                address2: request.address2,
            },
            request.description,
        )
    }

    /// 创建订单并发起推送
    pub async fn submit_order(&self, request: PlaceOrderRequest) -> DomainResult<OrderHandle> {
        // 1. 校验
        let draft = self.build_draft(request)?;

        // 2. 出站请求前先落库
        let mut order = self.repository.create(draft).await?;
        info!("Order {} created for {}", order.id, order.amount);

        // 3. 令牌 + 推送
        let outcome = self.request_push(&order).await;

        // 4. 记录同步结果
        match outcome {
            Ok(response) => self.record_accepted(&mut order, response).await,
            Err(e) => {
                error!("STK push for order {} failed: {}", order.id, e);
                order.mark_as_failed(Some(e.to_string()));
                if let Err(update_err) = self.repository.update(&order, OrderStatus::Pending).await
                {
                    error!(
                        "Could not mark order {} as failed: {}",
                        order.id, update_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn request_push(&self, order: &Order) -> DomainResult<StkPushResponse> {
        let token = self.mobile_money.request_access_token().await?;

        let response = self
            .mobile_money
            .stk_push(
                &token,
                StkPushRequest {
                    amount: order.amount,
                    phone_number: order.phone_number.clone(),
                    account_reference: order.account_reference(),
                    transaction_desc: order.transaction_desc(),
                },
            )
            .await?;

        if !response.is_accepted() {
            return Err(DomainError::PaymentRequestError(response.failure_reason()));
        }

        Ok(response)
    }

    async fn record_accepted(
        &self,
        order: &mut Order,
        response: StkPushResponse,
    ) -> DomainResult<OrderHandle> {
        let Some(checkout_request_id) = response.checkout_request_id.filter(|id| !id.is_empty())
        else {
            let e = DomainError::PaymentRequestError(
                "Provider accepted the push without a CheckoutRequestID".to_string(),
            );
            order.mark_as_failed(Some(e.to_string()));
            self.repository.update(order, OrderStatus::Pending).await?;
            return Err(e);
        };

        order.mark_as_processing(
            checkout_request_id.clone(),
            response.merchant_request_id,
            response.customer_message.or(response.response_description),
        )?;

        if !self.repository.update(order, OrderStatus::Pending).await? {
            // 订单在推送期间被其他写入改动。
            // 早于此写入到达的回调查不到关联号，会被确认后丢弃，订单停留在 processing，需人工对账
            return Err(DomainError::InternalError(format!(
                "Order {} changed while its push was in flight",
                order.id
            )));
        }

        info!(
            "Order {} is processing, checkout request {}",
            order.id, checkout_request_id
        );

        Ok(OrderHandle {
            order_id: order.id,
            checkout_request_id,
        })
    }

    /// 查询订单状态
    pub async fn order_status(&self, id: OrderId) -> DomainResult<OrderStatusResponse> {
        debug!("Querying order: {}", id);

        let order = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(id.to_string()))?;

        if !order.is_finished() {
            debug!("Order {} still {}", id, order.status);
        }

        Ok(OrderStatusResponse::from(&order))
    }
}
