//! Domain types for the promotional feed.
//!
//! These types provide a clean, closed API separate from the raw
//! server payloads; normalization happens at the gateway boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use oferta_core::{Price, ProductId, StoreId};

/// A promotional product as held by the feed cache.
///
/// The authoritative copy lives on the server. The cache holds one
/// working copy per feed key; the same product id may appear in several
/// feeds at once as independent copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub product_id: ProductId,
    /// Short product description shown on the card.
    pub description: String,
    /// Price before the promotion.
    pub regular_price: Option<Price>,
    /// Promotional price.
    pub sale_price: Option<Price>,
    /// Store running the promotion.
    pub store_id: Option<StoreId>,
    /// First day the promotion applies.
    pub sale_starts: Option<NaiveDate>,
    /// Last day the promotion applies.
    pub sale_ends: Option<NaiveDate>,
    /// Flyer image reference.
    pub image_url: Option<String>,
    /// Whether the current user has favorited this product.
    pub is_favorite: bool,
    /// Whether the promotion is currently active (server-controlled).
    pub on_sale: bool,
}

/// A store that publishes promotions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    /// Store ID.
    pub store_id: StoreId,
    /// Display name (e.g., "Spar").
    pub name: String,
    /// Logo image reference.
    pub logo: Option<String>,
}

/// Opaque continuation token for the next page of a feed.
///
/// The server decides what goes in here; the cache only stores it and
/// hands it back on the next page request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    /// Wrap a server-issued token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token's serialized form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One server-delivered batch of products.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    /// Products in this page, in server order.
    pub products: Vec<Product>,
    /// Token for the following page; `None` when the feed is exhausted.
    pub next_page: Option<PageToken>,
}
