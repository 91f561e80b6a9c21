//! Raw API payloads and their conversion to domain types.
//!
//! The server sends loosely-typed JSON; everything is normalized here,
//! at the gateway boundary. Entries missing their identity field are
//! dropped (with a warning) rather than propagated inward.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use oferta_core::{CurrencyCode, Price, ProductId, StoreId};

use crate::types::{PageToken, Product, ProductPage, Store};

/// Raw product entry as delivered by `/getProducts` and
/// `/products-by-ids`.
#[derive(Debug, Deserialize)]
pub(super) struct RawProduct {
    #[serde(rename = "productId")]
    product_id: Option<i32>,
    #[serde(rename = "product_description", default)]
    description: Option<String>,
    #[serde(rename = "regular_price")]
    regular_price: Option<f64>,
    #[serde(rename = "sale_price")]
    sale_price: Option<f64>,
    #[serde(rename = "storeId")]
    store_id: Option<i32>,
    #[serde(rename = "sale_starts")]
    sale_starts: Option<NaiveDate>,
    #[serde(rename = "sale_ends")]
    sale_ends: Option<NaiveDate>,
    #[serde(rename = "image_url")]
    image_url: Option<String>,
    #[serde(rename = "isFavorite", default)]
    is_favorite: bool,
    #[serde(rename = "productOnSale", default)]
    on_sale: bool,
}

/// Raw `/getProducts` response body.
#[derive(Debug, Deserialize)]
pub(super) struct RawProductPage {
    #[serde(default)]
    data: Vec<RawProduct>,
    #[serde(rename = "nextPage")]
    next_page: Option<serde_json::Value>,
}

/// Raw store entry as delivered by `/getStores`.
#[derive(Debug, Deserialize)]
pub(super) struct RawStore {
    #[serde(rename = "storeId")]
    store_id: Option<i32>,
    #[serde(rename = "storeName", default)]
    name: Option<String>,
    #[serde(rename = "logo")]
    logo: Option<String>,
}

/// Convert a raw product, or drop it when the identity field is absent.
pub(super) fn convert_product(raw: RawProduct) -> Option<Product> {
    let Some(product_id) = raw.product_id else {
        warn!(payload = ?raw, "dropping product payload without productId");
        return None;
    };

    Some(Product {
        product_id: ProductId::new(product_id),
        description: raw.description.unwrap_or_default(),
        regular_price: raw.regular_price.and_then(convert_price),
        sale_price: raw.sale_price.and_then(convert_price),
        store_id: raw.store_id.map(StoreId::new),
        sale_starts: raw.sale_starts,
        sale_ends: raw.sale_ends,
        image_url: raw.image_url,
        is_favorite: raw.is_favorite,
        on_sale: raw.on_sale,
    })
}

/// Convert a raw page, preserving server order.
pub(super) fn convert_product_page(raw: RawProductPage) -> ProductPage {
    let next_page = raw.next_page.and_then(convert_page_token);
    ProductPage {
        products: raw.data.into_iter().filter_map(convert_product).collect(),
        next_page,
    }
}

pub(super) fn convert_products(raw: Vec<RawProduct>) -> Vec<Product> {
    raw.into_iter().filter_map(convert_product).collect()
}

pub(super) fn convert_stores(raw: Vec<RawStore>) -> Vec<Store> {
    raw.into_iter()
        .filter_map(|store| {
            let Some(store_id) = store.store_id else {
                warn!(payload = ?store, "dropping store payload without storeId");
                return None;
            };
            Some(Store {
                store_id: StoreId::new(store_id),
                name: store.name.unwrap_or_default(),
                logo: store.logo,
            })
        })
        .collect()
}

/// The server historically sends `nextPage` as a number but the token
/// is opaque to this client; accept numbers and strings, treat `null`
/// and anything else as exhausted.
fn convert_page_token(value: serde_json::Value) -> Option<PageToken> {
    match value {
        serde_json::Value::Number(n) => Some(PageToken::new(n.to_string())),
        serde_json::Value::String(s) if !s.is_empty() => Some(PageToken::new(s)),
        _ => None,
    }
}

/// Promotional prices arrive as JSON numbers, always in lek.
fn convert_price(amount: f64) -> Option<Price> {
    Decimal::try_from(amount)
        .ok()
        .map(|amount| Price::new(amount, CurrencyCode::ALL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_without_id_is_dropped() {
        let raw: RawProductPage = serde_json::from_str(
            r#"{
                "data": [
                    {"product_description": "no id at all"},
                    {"productId": 3, "product_description": "Djath i bardhë", "sale_price": 250.5, "productOnSale": true}
                ],
                "nextPage": 2
            }"#,
        )
        .unwrap();

        let page = convert_product_page(raw);
        assert_eq!(page.products.len(), 1);
        let product = &page.products[0];
        assert_eq!(product.product_id, ProductId::new(3));
        assert!(product.on_sale);
        assert_eq!(
            product.sale_price.map(|p| p.display()),
            Some("250.50 LEK".to_string())
        );
        assert_eq!(page.next_page, Some(PageToken::new("2")));
    }

    #[test]
    fn test_null_next_page_means_exhausted() {
        let raw: RawProductPage =
            serde_json::from_str(r#"{"data": [], "nextPage": null}"#).unwrap();
        assert_eq!(convert_product_page(raw).next_page, None);
    }

    #[test]
    fn test_missing_next_page_means_exhausted() {
        let raw: RawProductPage = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert_eq!(convert_product_page(raw).next_page, None);
    }

    #[test]
    fn test_string_page_token_passes_through() {
        let raw: RawProductPage =
            serde_json::from_str(r#"{"data": [], "nextPage": "cursor-abc"}"#).unwrap();
        assert_eq!(
            convert_product_page(raw).next_page,
            Some(PageToken::new("cursor-abc"))
        );
    }

    #[test]
    fn test_store_conversion_keeps_order_and_drops_broken_entries() {
        let raw: Vec<RawStore> = serde_json::from_str(
            r#"[
                {"storeId": 1, "storeName": "Spar", "logo": "spar.png"},
                {"storeName": "orphan"},
                {"storeId": 2, "storeName": "Viva Fresh"}
            ]"#,
        )
        .unwrap();

        let stores = convert_stores(raw);
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].name, "Spar");
        assert_eq!(stores[1].store_id, StoreId::new(2));
    }
}
