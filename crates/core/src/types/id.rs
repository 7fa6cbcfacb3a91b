//! Newtype IDs for type-safe entity references.
//!
//! EPCC identifies every resource with an opaque string (usually a UUID).
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! passing a cart item ID where a product ID is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use epcc_storefront_core::define_id;
/// define_id!(ProductId);
/// define_id!(CartItemId);
///
/// let product = ProductId::new("prod-1");
/// let item = CartItemId::new("prod-1");
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = item;
/// assert_eq!(product.as_str(), item.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(CartId);
define_id!(CartItemId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(FileId);
define_id!(TransactionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = CartId::new("c7f2a9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c7f2a9\"");

        let parsed: CartId = serde_json::from_str("\"c7f2a9\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display_and_conversions() {
        let id = ProductId::from("prod-1");
        assert_eq!(id.to_string(), "prod-1");
        assert_eq!(id.as_ref(), "prod-1");
        assert_eq!(id.into_inner(), "prod-1".to_string());
    }
}
