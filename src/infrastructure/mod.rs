pub mod adapters;
pub mod config;

pub use adapters::{DarajaAdapter, InMemoryOrderRepository, MySqlOrderRepository};
pub use config::{MpesaConfig, ServerConfig};
