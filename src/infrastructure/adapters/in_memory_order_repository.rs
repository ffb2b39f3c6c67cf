use crate::domain::errors::DomainResult;
use crate::domain::{Order, OrderDraft, OrderId, OrderStatus};
use crate::ports::order_repository_port::OrderRepositoryPort;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    next_id: OrderId,
    orders: HashMap<OrderId, Order>,
}

/// 内存订单仓储（本地运行与测试）
#[derive(Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<Inner>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前订单数量
    pub async fn len(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OrderRepositoryPort for InMemoryOrderRepository {
    async fn create(&self, draft: OrderDraft) -> DomainResult<Order> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;

        let order = Order::pending(inner.next_id, draft, Utc::now());
        inner.orders.insert(order.id, order.clone());

        debug!("Order saved in memory: {}", order.id);
        Ok(order)
    }

    async fn find_by_id(&self, id: OrderId) -> DomainResult<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn find_by_checkout_request_id(
        &self,
        checkout_request_id: &str,
    ) -> DomainResult<Option<Order>> {
        Ok(self
            .inner
            .read()
            .await
            .orders
            .values()
            .find(|o| o.checkout_request_id.as_deref() == Some(checkout_request_id))
            .cloned())
    }

    async fn update(&self, order: &Order, expected: OrderStatus) -> DomainResult<bool> {
        let mut inner = self.inner.write().await;

        match inner.orders.get_mut(&order.id) {
            Some(stored) if stored.status == expected => {
                *stored = order.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
