use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{
    Currency, Email, Money, Order, OrderDraft, OrderId, OrderStatus, PhoneNumber, ShippingDetails,
};
use crate::ports::order_repository_port::OrderRepositoryPort;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use tracing::{debug, warn};

const SELECT_COLUMNS: &str = r#"
    SELECT id, phone_number, email, amount_cents, currency,
           first_name, last_name, address1, address2, description,
           status, merchant_request_id, checkout_request_id,
           mpesa_receipt_number, result_desc, created_at, updated_at
    FROM orders
"#;

/// MySQL订单仓储实现
#[derive(Clone)]
pub struct MySqlOrderRepository {
    pool: Arc<Pool<MySql>>,
}

impl MySqlOrderRepository {
    pub fn new(pool: Arc<Pool<MySql>>) -> Self {
        Self { pool }
    }

    /// 执行内嵌的数据库迁移
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepositoryPort for MySqlOrderRepository {
    /// 保存新订单
    async fn create(&self, draft: OrderDraft) -> DomainResult<Order> {
        let query = r#"
            INSERT INTO orders (
                phone_number, email, amount_cents, currency,
                first_name, last_name, address1, address2, description,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let now = Utc::now();
        let result = sqlx::query(query)
            .bind(draft.phone_number.as_str())
            .bind(draft.email.as_ref().map(Email::as_str))
            .bind(draft.amount.to_cents())
            .bind(draft.currency.as_str())
            .bind(&draft.shipping.first_name)
            .bind(&draft.shipping.last_name)
            .bind(&draft.shipping.address1)
            .bind(&draft.shipping.address2)
            .bind(&draft.description)
            .bind(OrderStatus::Pending.to_string())
            .bind(now)
            .bind(now)
            .execute(self.pool.as_ref())
            .await?;

        let id = OrderId::try_from(result.last_insert_id()).map_err(|_| {
            DomainError::InternalError(format!(
                "Order id out of range: {}",
                result.last_insert_id()
            ))
        })?;

        debug!("Order saved: {}", id);
        Ok(Order::pending(id, draft, now))
    }

    /// 根据ID查找订单
    async fn find_by_id(&self, id: OrderId) -> DomainResult<Option<Order>> {
        let query = format!("{} WHERE id = ?", SELECT_COLUMNS);

        let result = sqlx::query_as::<_, OrderRow>(&query)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        result.map(OrderRow::into_order).transpose()
    }

    /// 根据结账请求号查找
    async fn find_by_checkout_request_id(
        &self,
        checkout_request_id: &str,
    ) -> DomainResult<Option<Order>> {
        let query = format!("{} WHERE checkout_request_id = ?", SELECT_COLUMNS);

        let result = sqlx::query_as::<_, OrderRow>(&query)
            .bind(checkout_request_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        result.map(OrderRow::into_order).transpose()
    }

    /// 条件更新订单
    async fn update(&self, order: &Order, expected: OrderStatus) -> DomainResult<bool> {
        let query = r#"
            UPDATE orders
            SET status = ?, merchant_request_id = ?, checkout_request_id = ?,
                mpesa_receipt_number = ?, result_desc = ?, updated_at = ?
            WHERE id = ? AND status = ?
        "#;

        let rows_affected = sqlx::query(query)
            .bind(order.status.to_string())
            .bind(&order.merchant_request_id)
            .bind(&order.checkout_request_id)
            .bind(&order.mpesa_receipt_number)
            .bind(&order.result_desc)
            .bind(order.updated_at)
            .bind(order.id)
            .bind(expected.to_string())
            .execute(self.pool.as_ref())
            .await?
            .rows_affected();

        if rows_affected == 0 {
            warn!(
                "Order {} was not in state {}, update to {} skipped",
                order.id, expected, order.status
            );
            return Ok(false);
        }

        debug!("Order updated: {} -> {}", order.id, order.status);
        Ok(true)
    }
}

/// 数据库行结构体
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    phone_number: String,
    email: Option<String>,
    amount_cents: i64,
    currency: String,
    first_name: Option<String>,
    last_name: Option<String>,
    address1: Option<String>,
    address2: Option<String>,
    description: Option<String>,
    status: String,
    merchant_request_id: Option<String>,
    checkout_request_id: Option<String>,
    mpesa_receipt_number: Option<String>,
    result_desc: Option<String>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> DomainResult<Order> {
        let email = self.email.as_deref().map(Email::parse).transpose()?;

        Ok(Order {
            id: self.id,
            phone_number: PhoneNumber::parse(&self.phone_number)?,
            email,
            amount: Money::from_cents(self.amount_cents),
            currency: Currency::parse(&self.currency)?,
            shipping: ShippingDetails {
                first_name: self.first_name,
                last_name: self.last_name,
                address1: self.address1,
                address2: self.address2,
            },
            description: self.description,
            status: self.status.parse()?,
            merchant_request_id: self.merchant_request_id,
            checkout_request_id: self.checkout_request_id,
            mpesa_receipt_number: self.mpesa_receipt_number,
            result_desc: self.result_desc,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
