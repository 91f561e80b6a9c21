//! Filter tuple and cache key derivation.
//!
//! A filter combination identifies one independent paginated feed. Two
//! tuples that normalize identically are the same feed: the cache key
//! is their normalized serialization, stable under re-render.

use std::fmt;

use oferta_core::{StoreId, UserId};

/// Keywords shorter than this are treated as absent.
///
/// Matches the search box behavior: typing one or two characters does
/// not narrow the feed.
pub const MIN_KEYWORD_LEN: usize = 3;

/// The current feed filter inputs.
///
/// `user_id` participates in the key because favorite flags are
/// per-user; an anonymous feed and a signed-in feed are distinct feeds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterParams {
    /// Resolved user identity, if any.
    pub user_id: Option<UserId>,
    /// Restrict to one store; `None` means all stores.
    pub store_id: Option<StoreId>,
    /// Only products the user has favorited.
    pub favorites_only: bool,
    /// Only products currently on sale.
    pub on_sale_only: bool,
    /// Free-text search keyword (normalized before use).
    pub keyword: String,
}

impl FilterParams {
    /// The keyword after normalization, or `None` when it is too short
    /// to apply.
    #[must_use]
    pub fn normalized_keyword(&self) -> Option<&str> {
        let keyword = self.keyword.trim();
        (keyword.chars().count() >= MIN_KEYWORD_LEN).then_some(keyword)
    }

    /// Derive the cache key identifying this feed configuration.
    ///
    /// `None` ids render as `-` so that "no store selected" can never
    /// collide with a real store id (including zero).
    #[must_use]
    pub fn feed_key(&self) -> FeedKey {
        FeedKey(format!(
            "products:u{}:s{}:f{}:o{}:q{}",
            display_opt(self.user_id),
            display_opt(self.store_id),
            u8::from(self.favorites_only),
            u8::from(self.on_sale_only),
            self.normalized_keyword().unwrap_or(""),
        ))
    }
}

fn display_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Cache key for one paginated feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey(String);

impl FeedKey {
    /// The key's serialized form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_tuple_same_key() {
        let a = FilterParams {
            user_id: Some(UserId::new(7)),
            store_id: Some(StoreId::new(2)),
            favorites_only: true,
            on_sale_only: false,
            keyword: "djath".to_string(),
        };
        let b = a.clone();
        assert_eq!(a.feed_key(), b.feed_key());
    }

    #[test]
    fn test_short_keyword_collapses_to_absent() {
        let mut filter = FilterParams::default();
        filter.keyword = "dj".to_string();
        assert_eq!(filter.normalized_keyword(), None);
        assert_eq!(filter.feed_key(), FilterParams::default().feed_key());

        filter.keyword = "dja".to_string();
        assert_eq!(filter.normalized_keyword(), Some("dja"));
        assert_ne!(filter.feed_key(), FilterParams::default().feed_key());
    }

    #[test]
    fn test_keyword_is_trimmed_before_length_check() {
        let filter = FilterParams {
            keyword: "  ab  ".to_string(),
            ..FilterParams::default()
        };
        assert_eq!(filter.normalized_keyword(), None);
    }

    #[test]
    fn test_no_store_is_distinct_from_store_zero() {
        let none = FilterParams::default();
        let zero = FilterParams {
            store_id: Some(StoreId::new(0)),
            ..FilterParams::default()
        };
        assert_ne!(none.feed_key(), zero.feed_key());
    }

    #[test]
    fn test_each_tuple_field_participates_in_the_key() {
        let base = FilterParams::default();
        let variants = [
            FilterParams {
                user_id: Some(UserId::new(1)),
                ..base.clone()
            },
            FilterParams {
                store_id: Some(StoreId::new(1)),
                ..base.clone()
            },
            FilterParams {
                favorites_only: true,
                ..base.clone()
            },
            FilterParams {
                on_sale_only: true,
                ..base.clone()
            },
            FilterParams {
                keyword: "spar".to_string(),
                ..base.clone()
            },
        ];
        for variant in variants {
            assert_ne!(base.feed_key(), variant.feed_key(), "{variant:?}");
        }
    }
}
