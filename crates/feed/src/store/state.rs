//! Per-key feed state and its transitions.

use std::time::Instant;

use oferta_core::ProductId;

use crate::error::GatewayError;
use crate::types::{PageToken, ProductPage};

/// Lifecycle of one cached feed.
///
/// Transitions are driven by explicit events (a fetch starting, a
/// response arriving, an invalidation), never by a re-render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// Created, nothing fetched yet.
    Idle,
    /// First page in flight.
    Loading,
    /// A follow-up page in flight.
    LoadingMore,
    /// At least one page fetched; more may be available.
    Loaded,
    /// The last fetch failed; already-fetched pages are kept and the
    /// next fetch retries the same page.
    Error,
    /// The server reported no further pages.
    Exhausted,
}

impl FeedStatus {
    /// Whether a page request is currently in flight.
    #[must_use]
    pub const fn is_fetching(self) -> bool {
        matches!(self, Self::Loading | Self::LoadingMore)
    }
}

/// Everything the cache holds for one feed key.
#[derive(Debug)]
pub(crate) struct FeedState {
    /// Pages in fetch order. Concatenated they are the feed fetched so
    /// far; mutation changes fields in place, never positions.
    pub pages: Vec<ProductPage>,
    pub status: FeedStatus,
    pub error: Option<GatewayError>,
    /// Bumped on invalidation. An in-flight fetch or a pending rollback
    /// carrying an older generation discards its result instead of
    /// touching the reset state.
    pub generation: u64,
    /// Read clock for LRU eviction of settled keys.
    pub last_used: Instant,
}

impl FeedState {
    pub(crate) fn new() -> Self {
        Self {
            pages: Vec::new(),
            status: FeedStatus::Idle,
            error: None,
            generation: 0,
            last_used: Instant::now(),
        }
    }

    /// Token for the next page request.
    ///
    /// After a failed fetch the failed page was never appended, so this
    /// naturally re-yields the same token - a retry of the same page.
    pub(crate) fn next_token(&self) -> Option<&PageToken> {
        self.pages.last().and_then(|page| page.next_page.as_ref())
    }

    /// Discard all pages and reset to `Idle`, keeping the identity of
    /// the key but abandoning any in-flight work via the generation.
    pub(crate) fn reset(&mut self) {
        self.pages.clear();
        self.status = FeedStatus::Idle;
        self.error = None;
        self.generation += 1;
    }

    /// Current favorite flag of a product, from its first occurrence.
    pub(crate) fn favorite_state(&self, product_id: ProductId) -> Option<bool> {
        self.pages
            .iter()
            .flat_map(|page| &page.products)
            .find(|product| product.product_id == product_id)
            .map(|product| product.is_favorite)
    }

    /// Rewrite every occurrence of the product across all pages.
    ///
    /// Returns how many occurrences changed.
    pub(crate) fn set_favorite(&mut self, product_id: ProductId, favorite: bool) -> usize {
        let mut changed = 0;
        for page in &mut self.pages {
            for product in &mut page.products {
                if product.product_id == product_id && product.is_favorite != favorite {
                    product.is_favorite = favorite;
                    changed += 1;
                }
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Product;

    fn product(id: i32, favorite: bool) -> Product {
        Product {
            product_id: ProductId::new(id),
            description: format!("product {id}"),
            regular_price: None,
            sale_price: None,
            store_id: None,
            sale_starts: None,
            sale_ends: None,
            image_url: None,
            is_favorite: favorite,
            on_sale: true,
        }
    }

    fn state_with_pages() -> FeedState {
        let mut state = FeedState::new();
        state.pages.push(ProductPage {
            products: vec![product(1, false), product(2, true)],
            next_page: Some(PageToken::new("2")),
        });
        state.pages.push(ProductPage {
            // P1 appears again on page two; both copies must track
            products: vec![product(1, false)],
            next_page: None,
        });
        state
    }

    #[test]
    fn test_next_token_comes_from_last_page() {
        let mut state = state_with_pages();
        assert_eq!(state.next_token(), None);
        state.pages.pop();
        assert_eq!(state.next_token(), Some(&PageToken::new("2")));
    }

    #[test]
    fn test_set_favorite_rewrites_every_occurrence() {
        let mut state = state_with_pages();
        assert_eq!(state.favorite_state(ProductId::new(1)), Some(false));
        let changed = state.set_favorite(ProductId::new(1), true);
        assert_eq!(changed, 2);
        assert!(state.pages[0].products[0].is_favorite);
        assert!(state.pages[1].products[0].is_favorite);
        // P2 untouched
        assert!(state.pages[0].products[1].is_favorite);
    }

    #[test]
    fn test_set_favorite_preserves_positions() {
        let mut state = state_with_pages();
        let before: Vec<ProductId> = state
            .pages
            .iter()
            .flat_map(|p| &p.products)
            .map(|p| p.product_id)
            .collect();
        state.set_favorite(ProductId::new(1), true);
        let after: Vec<ProductId> = state
            .pages
            .iter()
            .flat_map(|p| &p.products)
            .map(|p| p.product_id)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reset_bumps_generation_and_clears_pages() {
        let mut state = state_with_pages();
        state.status = FeedStatus::Exhausted;
        state.reset();
        assert!(state.pages.is_empty());
        assert_eq!(state.status, FeedStatus::Idle);
        assert_eq!(state.generation, 1);
    }

    #[test]
    fn test_unknown_product_has_no_favorite_state() {
        let state = state_with_pages();
        assert_eq!(state.favorite_state(ProductId::new(99)), None);
    }
}
