//! Domain module
//!
//! Core domain types and business logic.

pub mod order_number;
pub mod quantity;
pub mod rating;
pub mod status;

pub use order_number::{OrderNumber, OrderNumberError};
pub use quantity::{Quantity, QuantityError};
pub use rating::{RatingError, RatingStats, StarRating};
pub use status::OrderStatus;
