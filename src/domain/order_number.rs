//! Order number
//!
//! Human-readable, globally unique order identifier generated at
//! order-creation time, distinct from the order's row id. Uniqueness is
//! enforced by the database constraint on `orders.order_number`;
//! generation only has to make collisions unlikely.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "ORD";

/// Compact UTC timestamp, second precision: YYYYMMDDHHMMSS
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

const SUFFIX_LEN: usize = 5;
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A validated order number of the form `ORD-<timestamp>-<suffix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNumber(String);

/// Errors that can occur when parsing an OrderNumber
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderNumberError {
    #[error("Invalid order number format: {0}")]
    InvalidFormat(String),
}

impl OrderNumber {
    /// Generate a fresh order number for the given creation time.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
            .collect();

        Self(format!(
            "{PREFIX}-{}-{suffix}",
            at.format(TIMESTAMP_FORMAT)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OrderNumberError::InvalidFormat(s.to_string());

        let mut parts = s.split('-');
        let (prefix, timestamp, suffix) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(p), Some(t), Some(x), None) => (p, t, x),
                _ => return Err(invalid()),
            };

        if prefix != PREFIX {
            return Err(invalid());
        }

        if timestamp.len() != TIMESTAMP_LEN
            || !timestamp.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        if suffix.len() != SUFFIX_LEN
            || !suffix.bytes().all(|b| SUFFIX_CHARSET.contains(&b))
        {
            return Err(invalid());
        }

        Ok(Self(s.to_string()))
    }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self {
        number.0
    }
}
