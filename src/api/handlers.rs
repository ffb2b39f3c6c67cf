use crate::application::{
    CallbackService, ErrorResponse, PaymentService, PlaceOrderRequest, PlaceOrderResponse,
};
use crate::domain::errors::DomainError;
use crate::domain::{Acknowledgement, OrderId};
use crate::ports::{MobileMoneyPort, OrderRepositoryPort};
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 应用状态
pub struct AppState<M: MobileMoneyPort, R: OrderRepositoryPort> {
    pub payment_service: Arc<PaymentService<M, R>>,
    pub callback_service: Arc<CallbackService<R>>,
}

impl<M: MobileMoneyPort, R: OrderRepositoryPort> Clone for AppState<M, R> {
    fn clone(&self) -> Self {
        Self {
            payment_service: self.payment_service.clone(),
            callback_service: self.callback_service.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// 领域错误映射为HTTP状态码
fn error_status(e: &DomainError) -> StatusCode {
    match e {
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_upstream_error() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(code: &str, e: DomainError) -> ApiError {
    let status = error_status(&e);
    let message = match &e {
        DomainError::PaymentRequestError(reason) => reason.clone(),
        DomainError::DatabaseError(_) | DomainError::InternalError(_) => {
            "Failed to place order, please retry the submission".to_string()
        }
        other => other.to_string(),
    };
    (status, Json(ErrorResponse::new(code.to_string(), message)))
}

/// 下单并发起STK推送
pub async fn place_order<M: MobileMoneyPort, R: OrderRepositoryPort>(
    State(state): State<AppState<M, R>>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected order body: {}", rejection.body_text());
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "INVALID_REQUEST".to_string(),
                rejection.body_text(),
            )),
        )
    })?;

    info!("Received order for {:?}", request.mpesa_number);

    state
        .payment_service
        .submit_order(request)
        .await
        .map(|handle| (StatusCode::OK, Json(PlaceOrderResponse::from(handle))))
        .map_err(|e| {
            error!("Order placement error: {}", e);
            api_error("PAYMENT_ERROR", e)
        })
}

/// 查询订单状态
pub async fn order_status<M: MobileMoneyPort, R: OrderRepositoryPort>(
    State(state): State<AppState<M, R>>,
    order_id: Result<Path<OrderId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(order_id) = order_id.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "INVALID_REQUEST".to_string(),
                rejection.body_text(),
            )),
        )
    })?;

    state
        .payment_service
        .order_status(order_id)
        .await
        .map(|response| (StatusCode::OK, Json(response)))
        .map_err(|e| {
            if !matches!(e, DomainError::OrderNotFound(_)) {
                error!("Order status error: {}", e);
            }
            api_error("QUERY_ERROR", e)
        })
}

/// M-Pesa STK 回调，始终返回 200
pub async fn mpesa_callback<M: MobileMoneyPort, R: OrderRepositoryPort>(
    State(state): State<AppState<M, R>>,
    body: Bytes,
) -> impl IntoResponse {
    info!("Received M-Pesa callback");

    let ack = match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(payload) => state.callback_service.handle_callback(&payload).await,
        Err(e) => {
            warn!(
                "Callback body is not JSON: {}; body: {}",
                e,
                String::from_utf8_lossy(&body)
            );
            Acknowledgement::rejected(format!("Invalid JSON: {}", e))
        }
    };

    (StatusCode::OK, Json(ack))
}

/// 健康检查
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
