use crate::domain::errors::DomainResult;
use crate::domain::{Order, OrderDraft, OrderId, OrderStatus};
use async_trait::async_trait;

/// 订单仓储端口接口
#[async_trait]
pub trait OrderRepositoryPort: Send + Sync {
    /// 保存新订单（状态为 pending），由存储层分配ID
    async fn create(&self, draft: OrderDraft) -> DomainResult<Order>;

    /// 根据ID查找订单
    async fn find_by_id(&self, id: OrderId) -> DomainResult<Option<Order>>;

    /// 根据服务商结账请求号查找
    async fn find_by_checkout_request_id(
        &self,
        checkout_request_id: &str,
    ) -> DomainResult<Option<Order>>;

    /// 条件更新：仅当存储中的状态仍为 `expected` 时写入。
    /// 返回 false 表示订单已被其他请求推进。
    async fn update(&self, order: &Order, expected: OrderStatus) -> DomainResult<bool>;
}
