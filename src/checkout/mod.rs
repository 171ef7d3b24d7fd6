//! Checkout
//!
//! Atomic order placement against live stock and the order status
//! lifecycle.

pub mod commands;
pub mod handler;

pub use commands::{CreateOrderCommand, CreateOrderResult, OrderItemInput, UpdateStatusResult};
pub use handler::CheckoutHandler;
