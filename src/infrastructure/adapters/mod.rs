pub mod daraja_adapter;
pub mod in_memory_order_repository;
pub mod mysql_order_repository;

pub use daraja_adapter::DarajaAdapter;
pub use in_memory_order_repository::InMemoryOrderRepository;
pub use mysql_order_repository::MySqlOrderRepository;
