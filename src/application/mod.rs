pub mod callback_service;
pub mod dto;
pub mod payment_service;

pub use callback_service::{CallbackService, Reconciliation};
pub use dto::*;
pub use payment_service::PaymentService;
