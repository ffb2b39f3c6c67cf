pub mod mobile_money_port;
pub mod order_repository_port;

pub use mobile_money_port::{AccessToken, MobileMoneyPort, StkPushRequest, StkPushResponse};
pub use order_repository_port::OrderRepositoryPort;
