pub mod callback;
pub mod entities;
pub mod errors;
pub mod value_objects;

pub use callback::{Acknowledgement, StkCallback};
pub use entities::{Order, OrderDraft, OrderId, ShippingDetails, Transition};
pub use errors::{DomainError, DomainResult};
pub use value_objects::{
    AmountInput, Currency, Email, Money, OrderStatus, PhoneInput, PhoneNumber,
};
