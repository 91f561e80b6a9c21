//! The feed store: one state-management unit owning every cached feed.
//!
//! All shared mutable state of this crate lives here - the feed-state
//! table keyed by [`FeedKey`] and the notification product set. Every
//! write goes through the operations on [`FeedStore`]; no other code
//! path touches pages or product fields.
//!
//! The store is scoped to its consumer (typically one screen/session),
//! not a process-wide singleton: create it empty, drop it with the
//! consumer.

mod favorites;
mod notifications;
mod state;

pub use notifications::NotificationStatus;
pub use state::FeedStatus;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, instrument};

use oferta_core::ProductId;

use crate::assemble::{FeedEntry, assemble};
use crate::error::{FeedError, GatewayError};
use crate::filter::{FeedKey, FilterParams};
use crate::gateway::ProductGateway;
use crate::types::{ProductPage, Store};

use notifications::NotificationSet;
use state::FeedState;

/// Upper bound on retained feed keys.
///
/// Returning to a recent filter combination resumes from cache; the
/// least recently used settled key is evicted beyond this.
const MAX_CACHED_FEEDS: usize = 16;

/// A favorite toggle that has been applied locally but not yet settled.
#[derive(Debug)]
struct PendingToggle {
    /// Favorite flag of the product before the optimistic flip.
    original: bool,
    /// Generation of the feed when the flip was applied.
    generation: u64,
    /// Latest intended favorite state. A second toggle before
    /// settlement updates this instead of issuing its own call.
    target: bool,
}

#[derive(Debug, Default)]
struct Inner {
    states: HashMap<FeedKey, FeedState>,
    pending: HashMap<(FeedKey, ProductId), PendingToggle>,
}

/// Read-only view of one feed's status for the presentation layer.
#[derive(Debug, Clone)]
pub struct FeedView {
    /// Current state-machine position.
    pub status: FeedStatus,
    /// Last recorded fetch failure, if still relevant.
    pub error: Option<GatewayError>,
    /// Pages fetched so far.
    pub pages_fetched: usize,
    /// Total products across the fetched pages.
    pub product_count: usize,
}

/// Paginated feed cache with optimistic favorite mutations.
///
/// Generic over the [`ProductGateway`] transport. All methods take
/// `&self`; internal locks are never held across a gateway call.
pub struct FeedStore<G> {
    gateway: G,
    inner: Mutex<Inner>,
    notifications: Mutex<NotificationSet>,
}

impl<G: ProductGateway> FeedStore<G> {
    /// Create an empty feed store on top of a gateway.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            inner: Mutex::new(Inner::default()),
            notifications: Mutex::new(NotificationSet::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_notifications(&self) -> MutexGuard<'_, NotificationSet> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure a feed exists for this filter and has begun loading.
    ///
    /// A no-op when the key already holds pages (or a fetch is in
    /// flight); after an [`invalidate`](Self::invalidate) it restarts
    /// from page one.
    ///
    /// # Errors
    ///
    /// Propagates the gateway failure when the initial page fetch fails.
    pub async fn ensure_loaded(&self, filter: &FilterParams) -> Result<(), FeedError> {
        let key = filter.feed_key();
        let needs_fetch = {
            let mut inner = self.lock();
            match inner.states.get_mut(&key) {
                Some(state) => {
                    state.last_used = Instant::now();
                    state.status == FeedStatus::Idle && state.pages.is_empty()
                }
                None => true,
            }
        };

        if needs_fetch {
            self.fetch_next_page(filter).await?;
        }
        Ok(())
    }

    /// Fetch the next page for this filter's feed.
    ///
    /// Silently ignored while a fetch for the same key is in flight or
    /// the feed is exhausted - at most one request per key at any time.
    /// On an errored feed this retries the same page request.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure; the feed transitions to
    /// [`FeedStatus::Error`] keeping its fetched pages.
    #[instrument(skip(self, filter), fields(key = %filter.feed_key()))]
    pub async fn fetch_next_page(&self, filter: &FilterParams) -> Result<(), FeedError> {
        let key = filter.feed_key();

        let (token, generation) = {
            let mut inner = self.lock();
            if !inner.states.contains_key(&key) {
                Self::evict_lru(&mut inner);
                inner.states.insert(key.clone(), FeedState::new());
            }
            // just inserted above when absent
            let Some(state) = inner.states.get_mut(&key) else {
                return Ok(());
            };
            state.last_used = Instant::now();

            if state.status.is_fetching() || state.status == FeedStatus::Exhausted {
                debug!(status = ?state.status, "fetch ignored");
                return Ok(());
            }

            state.status = if state.pages.is_empty() {
                FeedStatus::Loading
            } else {
                FeedStatus::LoadingMore
            };
            (state.next_token().cloned(), state.generation)
        };

        let result = self.gateway.list_products(filter, token.as_ref()).await;

        let mut inner = self.lock();
        let Some(state) = inner.states.get_mut(&key) else {
            // key evicted while in flight; nothing to record
            return Ok(());
        };
        if state.generation != generation {
            // invalidated while in flight; the result belongs to the
            // abandoned page sequence
            debug!("discarding stale page response");
            return Ok(());
        }

        match result {
            Ok(page) => {
                let exhausted = page.next_page.is_none();
                state.pages.push(page);
                state.status = if exhausted {
                    FeedStatus::Exhausted
                } else {
                    FeedStatus::Loaded
                };
                state.error = None;
                Ok(())
            }
            Err(err) => {
                state.status = FeedStatus::Error;
                state.error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// Discard this filter's pages and reset to `Idle`.
    ///
    /// The next `ensure_loaded`/`fetch_next_page` restarts from page
    /// one. A fetch already in flight for the old pages is discarded on
    /// arrival.
    pub fn invalidate(&self, filter: &FilterParams) {
        let key = filter.feed_key();
        let mut inner = self.lock();
        if let Some(state) = inner.states.get_mut(&key) {
            state.reset();
        }
    }

    /// Current status of this filter's feed.
    #[must_use]
    pub fn view(&self, filter: &FilterParams) -> FeedView {
        let key = filter.feed_key();
        let inner = self.lock();
        inner.states.get(&key).map_or(
            FeedView {
                status: FeedStatus::Idle,
                error: None,
                pages_fetched: 0,
                product_count: 0,
            },
            |state| FeedView {
                status: state.status,
                error: state.error.clone(),
                pages_fetched: state.pages.len(),
                product_count: state.pages.iter().map(|p| p.products.len()).sum(),
            },
        )
    }

    /// The fetched pages for this filter, in fetch order.
    #[must_use]
    pub fn pages(&self, filter: &FilterParams) -> Vec<ProductPage> {
        let key = filter.feed_key();
        let mut inner = self.lock();
        inner.states.get_mut(&key).map_or_else(Vec::new, |state| {
            state.last_used = Instant::now();
            state.pages.clone()
        })
    }

    /// The display sequence for this filter: notification products
    /// first, then the cached feed partitioned into on-sale and
    /// off-sale sections, deduplicated by product id.
    #[must_use]
    pub fn assembled(&self, filter: &FilterParams) -> Vec<FeedEntry> {
        let notification_products = self.notification_products();
        let pages = self.pages(filter);
        assemble(&notification_products, &pages)
    }

    /// The store list for the filter bar.
    ///
    /// # Errors
    ///
    /// Propagates the gateway failure.
    pub async fn stores(&self) -> Result<Vec<Store>, FeedError> {
        Ok(self.gateway.list_stores().await?)
    }

    pub(crate) const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Evict the least recently used settled key once the table is
    /// full. Keys with a fetch or a toggle in flight are never evicted.
    fn evict_lru(inner: &mut Inner) {
        if inner.states.len() < MAX_CACHED_FEEDS {
            return;
        }

        let victim = inner
            .states
            .iter()
            .filter(|(key, state)| {
                !state.status.is_fetching()
                    && !inner.pending.keys().any(|(pending_key, _)| pending_key == *key)
            })
            .min_by_key(|(_, state)| state.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            debug!(%key, "evicting least recently used feed");
            inner.states.remove(&key);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use oferta_core::StoreId;

    use crate::types::{PageToken, Product};

    /// Minimal scripted gateway for driving the state machine. The
    /// full mock with gated responses lives in the integration-tests
    /// crate.
    #[derive(Default)]
    struct StubGateway {
        pages: Mutex<VecDeque<Result<ProductPage, GatewayError>>>,
        page_calls: AtomicUsize,
        page_tokens: Mutex<Vec<Option<PageToken>>>,
    }

    impl StubGateway {
        fn script_page(&self, result: Result<ProductPage, GatewayError>) {
            self.pages.lock().unwrap().push_back(result);
        }

        fn page_calls(&self) -> usize {
            self.page_calls.load(Ordering::SeqCst)
        }

        fn page_tokens(&self) -> Vec<Option<PageToken>> {
            self.page_tokens.lock().unwrap().clone()
        }
    }

    impl ProductGateway for &StubGateway {
        async fn list_products(
            &self,
            _filter: &FilterParams,
            page: Option<&PageToken>,
        ) -> Result<ProductPage, GatewayError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            self.page_tokens.lock().unwrap().push(page.cloned());
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Network("unscripted call".to_string())))
        }

        async fn list_stores(&self) -> Result<Vec<Store>, GatewayError> {
            Ok(Vec::new())
        }

        async fn list_products_by_ids(
            &self,
            _ids: &[ProductId],
        ) -> Result<Vec<Product>, GatewayError> {
            Ok(Vec::new())
        }

        async fn set_favorite(
            &self,
            _product_id: ProductId,
            _favorite: bool,
        ) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    fn product(id: i32) -> Product {
        Product {
            product_id: ProductId::new(id),
            description: format!("product {id}"),
            regular_price: None,
            sale_price: None,
            store_id: None,
            sale_starts: None,
            sale_ends: None,
            image_url: None,
            is_favorite: false,
            on_sale: true,
        }
    }

    fn page(ids: &[i32], next: Option<&str>) -> ProductPage {
        ProductPage {
            products: ids.iter().copied().map(product).collect(),
            next_page: next.map(PageToken::new),
        }
    }

    #[tokio::test]
    async fn test_ensure_loaded_fetches_page_one_exactly_once() {
        let gateway = StubGateway::default();
        gateway.script_page(Ok(page(&[1, 2], Some("2"))));
        let store = FeedStore::new(&gateway);
        let filter = FilterParams::default();

        store.ensure_loaded(&filter).await.unwrap();
        store.ensure_loaded(&filter).await.unwrap();

        assert_eq!(gateway.page_calls(), 1);
        let view = store.view(&filter);
        assert_eq!(view.status, FeedStatus::Loaded);
        assert_eq!(view.product_count, 2);
    }

    #[tokio::test]
    async fn test_exhausted_feed_ignores_further_fetches() {
        let gateway = StubGateway::default();
        gateway.script_page(Ok(page(&[1], None)));
        let store = FeedStore::new(&gateway);
        let filter = FilterParams::default();

        store.fetch_next_page(&filter).await.unwrap();
        assert_eq!(store.view(&filter).status, FeedStatus::Exhausted);

        store.fetch_next_page(&filter).await.unwrap();
        assert_eq!(gateway.page_calls(), 1);
    }

    #[tokio::test]
    async fn test_error_keeps_pages_and_retries_the_same_page() {
        let gateway = StubGateway::default();
        gateway.script_page(Ok(page(&[1], Some("2"))));
        gateway.script_page(Err(GatewayError::Network("offline".to_string())));
        gateway.script_page(Ok(page(&[2], None)));
        let store = FeedStore::new(&gateway);
        let filter = FilterParams::default();

        store.fetch_next_page(&filter).await.unwrap();
        let err = store.fetch_next_page(&filter).await.unwrap_err();
        assert!(matches!(err, FeedError::Gateway(GatewayError::Network(_))));

        let view = store.view(&filter);
        assert_eq!(view.status, FeedStatus::Error);
        assert!(view.error.is_some());
        assert_eq!(view.pages_fetched, 1);

        store.fetch_next_page(&filter).await.unwrap();
        assert_eq!(store.view(&filter).status, FeedStatus::Exhausted);
        assert_eq!(store.view(&filter).pages_fetched, 2);

        // the failed request and its retry carried the same token
        let tokens = gateway.page_tokens();
        assert_eq!(tokens[1], Some(PageToken::new("2")));
        assert_eq!(tokens[2], Some(PageToken::new("2")));
    }

    #[tokio::test]
    async fn test_invalidate_restarts_from_page_one() {
        let gateway = StubGateway::default();
        gateway.script_page(Ok(page(&[1], Some("2"))));
        gateway.script_page(Ok(page(&[2], None)));
        gateway.script_page(Ok(page(&[3], None)));
        let store = FeedStore::new(&gateway);
        let filter = FilterParams::default();

        store.fetch_next_page(&filter).await.unwrap();
        store.fetch_next_page(&filter).await.unwrap();
        store.invalidate(&filter);
        assert_eq!(store.view(&filter).status, FeedStatus::Idle);
        assert_eq!(store.pages(&filter).len(), 0);

        store.ensure_loaded(&filter).await.unwrap();
        assert_eq!(gateway.page_tokens()[2], None, "restarted from page one");
        assert_eq!(store.view(&filter).pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_feed_table_stays_bounded() {
        let gateway = StubGateway::default();
        let store = FeedStore::new(&gateway);

        let filters: Vec<FilterParams> = (0..=MAX_CACHED_FEEDS as i32)
            .map(|i| FilterParams {
                store_id: Some(StoreId::new(i)),
                ..FilterParams::default()
            })
            .collect();

        for filter in &filters {
            gateway.script_page(Ok(page(&[1], None)));
            store.fetch_next_page(filter).await.unwrap();
        }

        // the oldest settled key was evicted to make room
        assert_eq!(store.pages(&filters[0]).len(), 0);
        assert_eq!(store.pages(&filters[1]).len(), 1);
    }
}
