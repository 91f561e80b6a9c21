//! Fetch gateway contract and the bundled HTTP implementation.
//!
//! The feed cache is transport-agnostic: it depends only on the four
//! operations of [`ProductGateway`]. The production transport is
//! [`HttpGateway`]; tests script their own implementations.

mod conversions;
mod http;

pub use http::HttpGateway;

use std::future::Future;

use oferta_core::ProductId;

use crate::error::GatewayError;
use crate::filter::FilterParams;
use crate::types::{PageToken, Product, ProductPage, Store};

/// Network operations the feed cache depends on.
///
/// Credentials are resolved at construction time; the cache never sees
/// them. Every call is a suspension point - the only ones in this
/// crate.
pub trait ProductGateway: Send + Sync {
    /// Fetch one page of products for a filter combination.
    ///
    /// `page` is `None` for the first page; afterwards it carries the
    /// token from the previous page.
    fn list_products(
        &self,
        filter: &FilterParams,
        page: Option<&PageToken>,
    ) -> impl Future<Output = Result<ProductPage, GatewayError>> + Send;

    /// Fetch the list of stores for the filter bar.
    fn list_stores(&self) -> impl Future<Output = Result<Vec<Store>, GatewayError>> + Send;

    /// Resolve a set of product ids to full product records.
    fn list_products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<Product>, GatewayError>> + Send;

    /// Mark or unmark a product as a favorite of the current user.
    fn set_favorite(
        &self,
        product_id: ProductId,
        favorite: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
