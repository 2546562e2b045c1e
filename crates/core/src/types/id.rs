//! Newtype IDs for type-safe entity references.
//!
//! Every entity in the shop is keyed by a string: users carry the id issued
//! by the identity provider, orders carry a short numeric code that customers
//! read out over the phone, and products use catalogue slugs. The
//! `define_id!` macro wraps those strings so IDs of different entities cannot
//! be mixed up.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
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

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
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

define_id!(
    /// Identity-provider user id (a Supabase UUID in production).
    UserId
);
define_id!(
    /// Catalogue product id.
    ProductId
);
define_id!(
    /// Six-digit order number, e.g. `806039`.
    OrderId
);
define_id!(
    /// Saved delivery address id.
    AddressId
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = OrderId::new("806039");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"806039\"");

        let parsed: OrderId = serde_json::from_str("\"806039\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_display_and_accessors() {
        let id = UserId::from("u1");
        assert_eq!(id.to_string(), "u1");
        assert_eq!(id.as_str(), "u1");
        assert_eq!(id.into_inner(), "u1".to_string());
    }
}
