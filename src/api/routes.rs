use super::handlers::*;
use crate::ports::{MobileMoneyPort, OrderRepositoryPort};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router<M, R>(state: AppState<M, R>) -> Router
where
    M: MobileMoneyPort + 'static,
    R: OrderRepositoryPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/place-order", post(place_order::<M, R>))
        .route("/api/order-status/:order_id", get(order_status::<M, R>))
        .route("/mpesa/callback", post(mpesa_callback::<M, R>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
