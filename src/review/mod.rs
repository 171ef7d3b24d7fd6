//! Product reviews
//!
//! Review submission and the published rating aggregate. Every review
//! write republishes the product's rating summary in the same
//! transaction.

pub mod aggregator;
pub mod commands;
pub mod handler;

pub use aggregator::RatingAggregator;
pub use commands::{SubmitReviewCommand, UpdateReviewCommand};
pub use handler::{ReviewHandler, ReviewView};
