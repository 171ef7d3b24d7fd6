//! Review command definitions
//!
//! Commands represent intentions to change review state.

use serde::{Deserialize, Serialize};

// =========================================================================
// SubmitReviewCommand
// =========================================================================

/// Command to submit a review for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReviewCommand {
    /// Star rating, an integer 1..=5 (validated by the handler)
    pub rating: i32,
    /// Free-form review text
    pub body: String,
}

impl SubmitReviewCommand {
    pub fn new(rating: i32, body: String) -> Self {
        Self { rating, body }
    }
}

// =========================================================================
// UpdateReviewCommand
// =========================================================================

/// Command to update an existing review; absent fields stay unchanged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReviewCommand {
    pub rating: Option<i32>,
    pub body: Option<String>,
}

impl UpdateReviewCommand {
    pub fn new() -> Self {
        Self {
            rating: None,
            body: None,
        }
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

impl Default for UpdateReviewCommand {
    fn default() -> Self {
        Self::new()
    }
}
