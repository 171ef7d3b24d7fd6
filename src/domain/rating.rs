//! Rating types
//!
//! Domain primitives for product reviews: the star rating submitted by a
//! user and the aggregated statistics published onto the product record.
//! Ratings are validated at construction time, ensuring out-of-range
//! values cannot exist in the system.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lowest allowed star rating
const MIN_STARS: i32 = 1;

/// Highest allowed star rating
const MAX_STARS: i32 = 5;

/// StarRating represents a validated review rating.
///
/// # Invariants
/// - Value is an integer between 1 and 5 inclusive
///
/// # Example
/// ```
/// use storefront_api::domain::StarRating;
///
/// let rating = StarRating::new(4).unwrap();
/// assert_eq!(rating.value(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct StarRating(i32);

/// Errors that can occur when creating a StarRating
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("Rating must be an integer between {MIN_STARS} and {MAX_STARS} (got {0})")]
    OutOfRange(i32),
}

impl StarRating {
    /// Create a new StarRating with validation.
    ///
    /// # Errors
    /// - `RatingError::OutOfRange` if value is outside 1..=5
    pub fn new(value: i32) -> Result<Self, RatingError> {
        if !(MIN_STARS..=MAX_STARS).contains(&value) {
            return Err(RatingError::OutOfRange(value));
        }

        Ok(Self(value))
    }

    /// Get the underlying value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for StarRating {
    type Error = RatingError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        StarRating::new(value)
    }
}

impl From<StarRating> for i32 {
    fn from(rating: StarRating) -> Self {
        rating.0
    }
}

/// Aggregated review statistics for one product.
///
/// `average_rating` is the arithmetic mean of all ratings, rounded to one
/// decimal place with ties going away from zero. `distribution` always
/// carries all five star buckets, including empty ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingStats {
    pub average_rating: Decimal,
    pub total_reviews: i64,
    pub distribution: BTreeMap<i32, i64>,
}

impl RatingStats {
    /// Statistics for a product with no reviews.
    pub fn empty() -> Self {
        Self::from_counts([0; 5])
    }

    /// Build statistics from per-star counts (index 0 = one star).
    pub fn from_counts(counts: [i64; 5]) -> Self {
        let total_reviews: i64 = counts.iter().sum();

        let average_rating = if total_reviews == 0 {
            zero_one_decimal()
        } else {
            let weighted: i64 = counts
                .iter()
                .enumerate()
                .map(|(i, count)| (i as i64 + 1) * count)
                .sum();

            let mut average = (Decimal::from(weighted) / Decimal::from(total_reviews))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            average.rescale(1);
            average
        };

        let distribution = (MIN_STARS..=MAX_STARS)
            .map(|stars| (stars, counts[(stars - 1) as usize]))
            .collect();

        Self {
            average_rating,
            total_reviews,
            distribution,
        }
    }

    /// Build statistics from `(rating, count)` rows as returned by a
    /// GROUP BY query. Rows outside 1..=5 are not counted.
    pub fn from_rows(rows: &[(i32, i64)]) -> Self {
        let mut counts = [0i64; 5];
        for (rating, count) in rows {
            if (MIN_STARS..=MAX_STARS).contains(rating) {
                counts[(rating - 1) as usize] = *count;
            }
        }
        Self::from_counts(counts)
    }
}

/// Decimal zero with scale 1, so it serializes as "0.0" like a stored rating.
fn zero_one_decimal() -> Decimal {
    Decimal::new(0, 1)
}
