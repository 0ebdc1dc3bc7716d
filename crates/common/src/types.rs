use serde::{Deserialize, Serialize};

/// Declares a row identifier newtype over the store's `BIGSERIAL` keys.
///
/// Each identifier is its own type so a `ProductId` can never be passed
/// where a `CategoryId` is expected.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw key.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw key.
            pub const fn as_i64(&self) -> i64 {
                self.0
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

row_id!(
    /// Identifier of a catalog product.
    ProductId
);

row_id!(
    /// Identifier of a product category.
    CategoryId
);

row_id!(
    /// Identifier of a user account.
    UserId
);

row_id!(
    /// Identifier of a shopping cart.
    CartId
);

row_id!(
    /// Identifier of a placed order.
    OrderId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_id_preserves_raw_key() {
        let id = ProductId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(i64::from(id), 42);
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(ProductId::new(42).to_string(), "42");
        assert_eq!(OrderId::from(7).to_string(), "7");
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&CategoryId::new(3)).unwrap();
        assert_eq!(json, "3");

        let id: UserId = serde_json::from_str("19").unwrap();
        assert_eq!(id, UserId::new(19));
    }

    #[test]
    fn ids_order_by_raw_key() {
        assert!(CartId::new(1) < CartId::new(2));
    }
}
