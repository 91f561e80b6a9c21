//! Test support for the Oferta feed cache.
//!
//! Provides [`MockGateway`], a scripted [`ProductGateway`] with call
//! recording and gated responses, plus fixture builders shared by the
//! tests in `tests/`.
//!
//! # Gated responses
//!
//! A gate is a zero-permit semaphore installed on one of the gateway
//! operations. A call blocks inside the gateway until the test adds a
//! permit, which lets a test observe state *while* a request is in
//! flight:
//!
//! ```rust,ignore
//! let gateway = MockGateway::new();
//! let gate = gateway.gate_favorites();
//! tokio::join!(
//!     store.toggle_favorite(&filter, product_id),
//!     async {
//!         // optimistic state is already visible here
//!         gate.add_permits(1);
//!     },
//! );
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Semaphore;

use oferta_core::{ProductId, StoreId};
use oferta_feed::gateway::ProductGateway;
use oferta_feed::{FilterParams, GatewayError, PageToken, Product, ProductPage, Store};

/// Install a test tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `debug` for the feed crate.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oferta_feed=debug")),
        )
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Fixtures
// =============================================================================

/// A product fixture with the fields the feed logic cares about.
#[must_use]
pub fn product(id: i32, on_sale: bool, favorite: bool) -> Product {
    Product {
        product_id: ProductId::new(id),
        description: format!("product {id}"),
        regular_price: None,
        sale_price: None,
        store_id: Some(StoreId::new(1)),
        sale_starts: None,
        sale_ends: None,
        image_url: Some(format!("{id}.png")),
        is_favorite: favorite,
        on_sale,
    }
}

/// A page fixture; `next` of `None` marks the feed exhausted.
#[must_use]
pub fn page(products: Vec<Product>, next: Option<&str>) -> ProductPage {
    ProductPage {
        products,
        next_page: next.map(PageToken::new),
    }
}

/// A store fixture.
#[must_use]
pub fn store(id: i32, name: &str) -> Store {
    Store {
        store_id: StoreId::new(id),
        name: name.to_string(),
        logo: None,
    }
}

// =============================================================================
// MockGateway
// =============================================================================

type Script<T> = Mutex<VecDeque<Result<T, GatewayError>>>;

#[derive(Default)]
struct MockInner {
    pages: Script<ProductPage>,
    stores: Script<Vec<Store>>,
    products_by_ids: Script<Vec<Product>>,
    favorites: Script<()>,

    page_calls: AtomicUsize,
    page_requests: Mutex<Vec<(String, Option<PageToken>)>>,
    favorite_requests: Mutex<Vec<(ProductId, bool)>>,
    ids_requests: Mutex<Vec<Vec<ProductId>>>,

    product_gate: Mutex<Option<Arc<Semaphore>>>,
    favorite_gate: Mutex<Option<Arc<Semaphore>>>,
    ids_gate: Mutex<Option<Arc<Semaphore>>>,
}

/// Scripted gateway: responses are consumed front-to-back per
/// operation; unscripted calls fail with a network error so a test
/// never hangs on missing setup.
#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<MockInner>,
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- scripting ---

    pub fn script_page(&self, result: Result<ProductPage, GatewayError>) {
        Self::lock(&self.inner.pages).push_back(result);
    }

    pub fn script_stores(&self, result: Result<Vec<Store>, GatewayError>) {
        Self::lock(&self.inner.stores).push_back(result);
    }

    pub fn script_products_by_ids(&self, result: Result<Vec<Product>, GatewayError>) {
        Self::lock(&self.inner.products_by_ids).push_back(result);
    }

    pub fn script_favorite(&self, result: Result<(), GatewayError>) {
        Self::lock(&self.inner.favorites).push_back(result);
    }

    // --- gating ---

    /// Block `list_products` calls until permits are added.
    #[must_use]
    pub fn gate_products(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *Self::lock(&self.inner.product_gate) = Some(Arc::clone(&gate));
        gate
    }

    /// Block `set_favorite` calls until permits are added.
    #[must_use]
    pub fn gate_favorites(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *Self::lock(&self.inner.favorite_gate) = Some(Arc::clone(&gate));
        gate
    }

    /// Block `list_products_by_ids` calls until permits are added.
    ///
    /// Installing a new gate only affects calls issued afterwards; a
    /// call already waiting keeps the gate it captured.
    #[must_use]
    pub fn gate_ids(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *Self::lock(&self.inner.ids_gate) = Some(Arc::clone(&gate));
        gate
    }

    // --- recording ---

    /// How many `list_products` calls were issued.
    #[must_use]
    pub fn page_calls(&self) -> usize {
        self.inner.page_calls.load(Ordering::SeqCst)
    }

    /// Every `list_products` request as `(feed key, page token)`.
    #[must_use]
    pub fn page_requests(&self) -> Vec<(String, Option<PageToken>)> {
        Self::lock(&self.inner.page_requests).clone()
    }

    /// Every `set_favorite` request as `(product, desired state)`.
    #[must_use]
    pub fn favorite_requests(&self) -> Vec<(ProductId, bool)> {
        Self::lock(&self.inner.favorite_requests).clone()
    }

    /// Every `list_products_by_ids` request.
    #[must_use]
    pub fn ids_requests(&self) -> Vec<Vec<ProductId>> {
        Self::lock(&self.inner.ids_requests).clone()
    }

    async fn wait(gate: &Mutex<Option<Arc<Semaphore>>>) {
        let gate = Self::lock(gate).clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn next<T>(script: &Script<T>) -> Result<T, GatewayError> {
        Self::lock(script)
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Network("unscripted call".to_string())))
    }
}

impl ProductGateway for MockGateway {
    async fn list_products(
        &self,
        filter: &FilterParams,
        page: Option<&PageToken>,
    ) -> Result<ProductPage, GatewayError> {
        self.inner.page_calls.fetch_add(1, Ordering::SeqCst);
        Self::lock(&self.inner.page_requests)
            .push((filter.feed_key().as_str().to_string(), page.cloned()));
        Self::wait(&self.inner.product_gate).await;
        Self::next(&self.inner.pages)
    }

    async fn list_stores(&self) -> Result<Vec<Store>, GatewayError> {
        Self::next(&self.inner.stores)
    }

    async fn list_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, GatewayError> {
        Self::lock(&self.inner.ids_requests).push(ids.to_vec());
        Self::wait(&self.inner.ids_gate).await;
        Self::next(&self.inner.products_by_ids)
    }

    async fn set_favorite(&self, product_id: ProductId, favorite: bool) -> Result<(), GatewayError> {
        Self::lock(&self.inner.favorite_requests).push((product_id, favorite));
        Self::wait(&self.inner.favorite_gate).await;
        Self::next(&self.inner.favorites)
    }
}
