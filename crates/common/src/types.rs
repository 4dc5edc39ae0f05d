use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database key.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying key.
            pub fn as_i64(&self) -> i64 {
                self.0
            }

            /// True if this is a usable key (database keys start at 1).
            pub fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_newtype! {
    /// Primary key of a user row.
    UserId
}

id_newtype! {
    /// Primary key of a product row.
    ProductId
}

id_newtype! {
    /// Primary key of a merchant row.
    MerchantId
}

/// Generated order number, the primary key of an order header.
///
/// Immutable once assigned and never reused. Produced by the checkout
/// crate's sequence generator; everything else treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNo(String);

impl OrderNo {
    /// Wraps an already-generated order number.
    pub fn new(no: impl Into<String>) -> Self {
        Self(no.into())
    }

    /// Returns the order number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderNo {
    fn from(no: String) -> Self {
        Self(no)
    }
}

/// Monetary amount in cents.
///
/// Exact integer arithmetic; no floating point anywhere near a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Zero amount.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Multiplies the amount by a quantity.
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * i64::from(quantity))
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validity() {
        assert!(ProductId::new(1).is_valid());
        assert!(!ProductId::new(0).is_valid());
        assert!(!ProductId::new(-7).is_valid());
    }

    #[test]
    fn id_serialization_is_transparent() {
        let id = UserId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: UserId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn order_no_roundtrip() {
        let no = OrderNo::new("202501021530450011234");
        assert_eq!(no.as_str(), "202501021530450011234");
        assert_eq!(no.to_string(), "202501021530450011234");
    }

    #[test]
    fn money_arithmetic() {
        let price = Money::from_cents(1250);
        assert_eq!(price.times(3).cents(), 3750);
        assert_eq!((price + Money::from_cents(50)).cents(), 1300);
        let total: Money = [price, price].into_iter().sum();
        assert_eq!(total.cents(), 2500);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(1999).to_string(), "19.99");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }
}
