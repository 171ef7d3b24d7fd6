//! Quantity type
//!
//! Domain primitive for item quantities with business rule validation.
//! Quantities are validated at construction time, ensuring non-positive
//! values cannot exist in the system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantity represents a validated item count.
///
/// # Invariants
/// - Value is always at least 1
///
/// # Example
/// ```
/// use storefront_api::domain::Quantity;
///
/// let quantity = Quantity::new(3).unwrap();
/// assert_eq!(quantity.value(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

/// Errors that can occur when creating a Quantity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    #[error("Quantity must be at least 1 (got {0})")]
    NotPositive(i32),
}

impl Quantity {
    /// Create a new Quantity with validation.
    ///
    /// # Errors
    /// - `QuantityError::NotPositive` if value < 1
    pub fn new(value: i32) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NotPositive(value));
        }

        Ok(Self(value))
    }

    /// Get the underlying value.
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_positive() {
        let quantity = Quantity::new(5);
        assert!(quantity.is_ok());
        assert_eq!(quantity.unwrap().value(), 5);
    }

    #[test]
    fn test_quantity_one_ok() {
        assert!(Quantity::new(1).is_ok());
    }

    #[test]
    fn test_quantity_zero_rejected() {
        let quantity = Quantity::new(0);
        assert!(matches!(quantity, Err(QuantityError::NotPositive(0))));
    }

    #[test]
    fn test_quantity_negative_rejected() {
        let quantity = Quantity::new(-3);
        assert!(matches!(quantity, Err(QuantityError::NotPositive(-3))));
    }

    #[test]
    fn test_quantity_serde_round_trip() {
        let quantity = Quantity::new(4).unwrap();
        let json = serde_json::to_string(&quantity).unwrap();
        assert_eq!(json, "4");

        let back: Quantity = serde_json::from_str("4").unwrap();
        assert_eq!(back, quantity);
    }

    #[test]
    fn test_quantity_serde_rejects_zero() {
        let result: Result<Quantity, _> = serde_json::from_str("0");
        assert!(result.is_err());
    }
}
