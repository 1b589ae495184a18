//! Domain rules that do not touch the database.

pub mod payment;
pub mod pricing;
pub mod role;
pub mod shipping_address;
pub mod status;

pub use payment::{CardBrand, PaymentDetails, PaymentMethod};
pub use pricing::{CheckoutQuote, PricedLine, ShippingPolicy};
pub use role::Role;
pub use shipping_address::ShippingAddress;
pub use status::OrderStatus;
