//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - Conversion methods: `new()`, `as_i32()`
/// - `From<i32>` and `Into<i32>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use plp_banners_core::define_id;
/// define_id!(ShopId);
/// define_id!(BannerId);
///
/// let shop_id = ShopId::new(1);
/// let banner_id = BannerId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ShopId = banner_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create a new ID from an i32 value.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// Get the underlying i32 value.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Define standard entity IDs
define_id!(ShopId);
define_id!(BannerId);
define_id!(PlacementId);
define_id!(TargetingRuleId);

/// Shop domain, validated against the `*.myshopify.com` pattern.
///
/// Shopify shop domains are a single label of alphanumerics and hyphens
/// (not starting with a hyphen) followed by `.myshopify.com`. Anything else
/// is rejected before it reaches a query or a signature check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopDomain(String);

/// Error parsing a shop domain.
#[derive(Debug, thiserror::Error)]
#[error("invalid shop domain: {0:?}")]
pub struct ShopDomainError(pub String);

impl ShopDomain {
    /// Parse and validate a shop domain.
    ///
    /// # Errors
    ///
    /// Returns `ShopDomainError` if the domain does not match
    /// `^[a-zA-Z0-9][a-zA-Z0-9-]*\.myshopify\.com$`.
    pub fn parse(domain: &str) -> Result<Self, ShopDomainError> {
        let Some(label) = domain.strip_suffix(".myshopify.com") else {
            return Err(ShopDomainError(domain.to_owned()));
        };

        let mut chars = label.chars();
        let valid_first = chars.next().is_some_and(|c| c.is_ascii_alphanumeric());
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '-');

        if valid_first && valid_rest {
            Ok(Self(domain.to_owned()))
        } else {
            Err(ShopDomainError(domain.to_owned()))
        }
    }

    /// Get the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types() {
        let shop = ShopId::new(7);
        let banner = BannerId::new(7);
        assert_eq!(shop.as_i32(), banner.as_i32());
    }

    #[test]
    fn test_shop_domain_valid() {
        assert!(ShopDomain::parse("dev-store.myshopify.com").is_ok());
        assert!(ShopDomain::parse("a.myshopify.com").is_ok());
        assert!(ShopDomain::parse("Store9.myshopify.com").is_ok());
    }

    #[test]
    fn test_shop_domain_invalid() {
        assert!(ShopDomain::parse("evil.com").is_err());
        assert!(ShopDomain::parse(".myshopify.com").is_err());
        assert!(ShopDomain::parse("-shop.myshopify.com").is_err());
        assert!(ShopDomain::parse("sh op.myshopify.com").is_err());
        assert!(ShopDomain::parse("shop.myshopify.com.evil.com").is_err());
        assert!(ShopDomain::parse("").is_err());
    }
}
