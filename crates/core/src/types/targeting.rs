//! Targeting rules: which browsing contexts a banner is eligible to appear in.

use serde::{Deserialize, Serialize};

/// Target kind for a single targeting rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Collection,
    Tag,
    Vendor,
    ProductType,
}

impl TargetKind {
    /// The database/API representation of the target kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "COLLECTION",
            Self::Tag => "TAG",
            Self::Vendor => "VENDOR",
            Self::ProductType => "PRODUCT_TYPE",
        }
    }
}

impl std::str::FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COLLECTION" => Ok(Self::Collection),
            "TAG" => Ok(Self::Tag),
            "VENDOR" => Ok(Self::Vendor),
            "PRODUCT_TYPE" => Ok(Self::ProductType),
            _ => Err(format!("invalid target type: {s}")),
        }
    }
}

/// A single targeting rule owned by a banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingRule {
    pub kind: TargetKind,
    pub value: String,
}

/// The browsing context extracted from a storefront request.
///
/// Every field is optional; a rule whose corresponding field is absent can
/// never match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TargetingContext {
    pub collection_id: Option<String>,
    pub tags: Vec<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
}

impl TargetingRule {
    /// Whether this rule matches the given context.
    ///
    /// COLLECTION compares the collection id by exact string equality; TAG,
    /// VENDOR, and PRODUCT_TYPE compare case-insensitively. Case folding is
    /// Unicode-aware, since merchants enter vendor and tag values in their
    /// own language.
    #[must_use]
    pub fn matches(&self, context: &TargetingContext) -> bool {
        match self.kind {
            TargetKind::Collection => context
                .collection_id
                .as_deref()
                .is_some_and(|id| id == self.value),
            TargetKind::Tag => context
                .tags
                .iter()
                .any(|tag| eq_ignore_case(tag, &self.value)),
            TargetKind::Vendor => context
                .vendor
                .as_deref()
                .is_some_and(|v| eq_ignore_case(v, &self.value)),
            TargetKind::ProductType => context
                .product_type
                .as_deref()
                .is_some_and(|t| eq_ignore_case(t, &self.value)),
        }
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(kind: TargetKind, value: &str) -> TargetingRule {
        TargetingRule {
            kind,
            value: value.to_owned(),
        }
    }

    #[test]
    fn test_collection_match_is_case_sensitive() {
        let r = rule(TargetKind::Collection, "Gid123");
        let mut ctx = TargetingContext {
            collection_id: Some("Gid123".to_owned()),
            ..TargetingContext::default()
        };
        assert!(r.matches(&ctx));

        ctx.collection_id = Some("gid123".to_owned());
        assert!(!r.matches(&ctx));
    }

    #[test]
    fn test_tag_match_is_case_insensitive() {
        let r = rule(TargetKind::Tag, "sale");
        let ctx = TargetingContext {
            tags: vec!["New".to_owned(), "SALE".to_owned()],
            ..TargetingContext::default()
        };
        assert!(r.matches(&ctx));
    }

    #[test]
    fn test_vendor_and_product_type_case_insensitive() {
        let vendor_rule = rule(TargetKind::Vendor, "Acme");
        let type_rule = rule(TargetKind::ProductType, "Shoes");
        let ctx = TargetingContext {
            vendor: Some("acme".to_owned()),
            product_type: Some("SHOES".to_owned()),
            ..TargetingContext::default()
        };
        assert!(vendor_rule.matches(&ctx));
        assert!(type_rule.matches(&ctx));
    }

    #[test]
    fn test_case_folding_is_unicode_aware() {
        let vendor_rule = rule(TargetKind::Vendor, "NESTLÉ");
        let ctx = TargetingContext {
            vendor: Some("nestlé".to_owned()),
            ..TargetingContext::default()
        };
        assert!(vendor_rule.matches(&ctx));

        let tag_rule = rule(TargetKind::Tag, "ÉTÉ");
        let ctx = TargetingContext {
            tags: vec!["été".to_owned()],
            ..TargetingContext::default()
        };
        assert!(tag_rule.matches(&ctx));
    }

    #[test]
    fn test_absent_context_field_never_matches() {
        let ctx = TargetingContext::default();
        assert!(!rule(TargetKind::Collection, "1").matches(&ctx));
        assert!(!rule(TargetKind::Tag, "sale").matches(&ctx));
        assert!(!rule(TargetKind::Vendor, "acme").matches(&ctx));
        assert!(!rule(TargetKind::ProductType, "shoes").matches(&ctx));
    }
}
