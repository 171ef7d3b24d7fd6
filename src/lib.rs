//! Storefront API Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod cart;
pub mod checkout;
pub mod domain;
pub mod review;

// Private modules (used only by main.rs binary)
pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use error::{is_unique_violation, AppError, AppResult};
pub use domain::{OrderNumber, OrderStatus, Quantity, RatingStats, StarRating};
