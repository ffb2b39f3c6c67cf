#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use mpesa_checkout::api::{self, AppState};
use mpesa_checkout::application::{CallbackService, PaymentService};
use mpesa_checkout::domain::Currency;
use mpesa_checkout::infrastructure::{DarajaAdapter, InMemoryOrderRepository, MpesaConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const SHORT_CODE: &str = "174379";
pub const PASSKEY: &str = "bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919";
pub const CONSUMER_KEY: &str = "key";
pub const CONSUMER_SECRET: &str = "secret";

/// 记录下来的推送请求
#[derive(Debug, Clone)]
pub struct RecordedPush {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct MockBehaviour {
    pub token_status: StatusCode,
    pub token_body: String,
    pub push_status: StatusCode,
    pub push_body: Value,
    pub push_delay: Duration,
}

impl Default for MockBehaviour {
    fn default() -> Self {
        Self {
            token_status: StatusCode::OK,
            token_body: json!({ "access_token": "mock-token", "expires_in": "3599" }).to_string(),
            push_status: StatusCode::OK,
            push_body: accepted_push("ws_1"),
            push_delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
pub struct MockState {
    pub behaviour: Mutex<MockBehaviour>,
    pub token_authorizations: Mutex<Vec<Option<String>>>,
    pub pushes: Mutex<Vec<RecordedPush>>,
}

/// 本地 Daraja 模拟服务
pub struct MockDaraja {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockDaraja {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let router = Router::new()
            .route("/oauth/v1/generate", get(token))
            .route("/mpesa/stkpush/v1/processrequest", post(stk_push))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn set_push_response(&self, status: StatusCode, body: Value) {
        let mut behaviour = self.state.behaviour.lock().unwrap();
        behaviour.push_status = status;
        behaviour.push_body = body;
    }

    pub fn set_token_response(&self, status: StatusCode, body: &str) {
        let mut behaviour = self.state.behaviour.lock().unwrap();
        behaviour.token_status = status;
        behaviour.token_body = body.to_string();
    }

    pub fn set_push_delay(&self, delay: Duration) {
        self.state.behaviour.lock().unwrap().push_delay = delay;
    }

    pub fn pushes(&self) -> Vec<RecordedPush> {
        self.state.pushes.lock().unwrap().clone()
    }

    pub fn token_authorizations(&self) -> Vec<Option<String>> {
        self.state.token_authorizations.lock().unwrap().clone()
    }

    pub fn config(&self, timeout: Duration) -> Arc<MpesaConfig> {
        Arc::new(MpesaConfig {
            base_url: self.base_url.clone(),
            consumer_key: CONSUMER_KEY.to_string(),
            consumer_secret: CONSUMER_SECRET.to_string(),
            short_code: SHORT_CODE.to_string(),
            passkey: PASSKEY.to_string(),
            callback_url: "https://shop.example.com/mpesa/callback".to_string(),
            transaction_type: "CustomerPayBillOnline".to_string(),
            currency: "KES".to_string(),
            request_timeout: timeout,
        })
    }

    pub fn adapter(&self) -> DarajaAdapter {
        DarajaAdapter::new(self.config(Duration::from_secs(5))).unwrap()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    state
        .token_authorizations
        .lock()
        .unwrap()
        .push(header(&headers, "authorization"));

    if query.get("grant_type").map(String::as_str) != Some("client_credentials") {
        return (StatusCode::BAD_REQUEST, "missing grant_type".to_string());
    }

    let behaviour = state.behaviour.lock().unwrap();
    (behaviour.token_status, behaviour.token_body.clone())
}

async fn stk_push(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.pushes.lock().unwrap().push(RecordedPush {
        authorization: header(&headers, "authorization"),
        body,
    });

    let (status, response, delay) = {
        let behaviour = state.behaviour.lock().unwrap();
        (
            behaviour.push_status,
            behaviour.push_body.clone(),
            behaviour.push_delay,
        )
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    (status, Json(response))
}

pub fn accepted_push(checkout_request_id: &str) -> Value {
    json!({
        "MerchantRequestID": "29115-34620561-1",
        "CheckoutRequestID": checkout_request_id,
        "ResponseCode": "0",
        "ResponseDescription": "Success. Request accepted for processing",
        "CustomerMessage": "Success. Request accepted for processing"
    })
}

pub fn stk_callback(checkout_request_id: &str, result_code: i64, result_desc: &str) -> Value {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_request_id,
                "ResultCode": result_code,
                "ResultDesc": result_desc
            }
        }
    })
}

/// 使用真实 Daraja 适配器与内存仓储的应用
pub fn app(
    adapter: DarajaAdapter,
) -> (Router, Arc<InMemoryOrderRepository>) {
    let repository = Arc::new(InMemoryOrderRepository::new());
    let state = AppState {
        payment_service: Arc::new(PaymentService::new(
            Arc::new(adapter),
            repository.clone(),
            Currency::parse("KES").unwrap(),
        )),
        callback_service: Arc::new(CallbackService::new(repository.clone())),
    };

    (api::create_router(state), repository)
}
