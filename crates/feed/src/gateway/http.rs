//! HTTP implementation of the fetch gateway.
//!
//! Talks to the Oferta promotions REST API with `reqwest`. The store
//! list is cached with `moka` (5-minute TTL); products are not cached
//! here - the feed store owns that state.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use oferta_core::ProductId;

use crate::config::FeedConfig;
use crate::error::GatewayError;
use crate::filter::FilterParams;
use crate::types::{PageToken, Product, ProductPage, Store};

use super::ProductGateway;
use super::conversions::{
    RawProduct, RawProductPage, RawStore, convert_product_page, convert_products, convert_stores,
};

const STORES_CACHE_KEY: &str = "stores";
const STORES_CACHE_TTL: Duration = Duration::from_secs(300);

/// Gateway for the Oferta promotions API.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<SecretString>,
    timeout: Duration,
    stores_cache: Cache<String, Vec<Store>>,
}

impl HttpGateway {
    /// Create a new gateway from configuration.
    #[must_use]
    pub fn new(config: &FeedConfig) -> Self {
        let stores_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(STORES_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(HttpGatewayInner {
                client: reqwest::Client::new(),
                base_url: config.api_url.clone(),
                api_token: config.api_token.clone(),
                timeout: config.timeout,
                stores_cache,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        // join() would drop a base path without a trailing slash
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Validation("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(path);
        Ok(url)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.api_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GatewayError> {
        let response = self
            .apply_auth(request)
            .timeout(self.inner.timeout)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        // Read the body as text first for better error diagnostics
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(match status.as_u16() {
                401 | 403 => GatewayError::Auth(snippet),
                404 => GatewayError::NotFound(snippet),
                400 | 422 => GatewayError::Validation(snippet),
                _ => GatewayError::Network(format!("HTTP {status}: {snippet}")),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            GatewayError::Parse(e.to_string())
        })
    }
}

impl ProductGateway for HttpGateway {
    #[instrument(skip(self, filter), fields(key = %filter.feed_key()))]
    async fn list_products(
        &self,
        filter: &FilterParams,
        page: Option<&PageToken>,
    ) -> Result<ProductPage, GatewayError> {
        let mut url = self.endpoint("getProducts")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", page.map_or("1", PageToken::as_str));
            if let Some(user_id) = filter.user_id {
                query.append_pair("userId", &user_id.to_string());
            }
            if let Some(store_id) = filter.store_id {
                query.append_pair("storeId", &store_id.to_string());
            }
            if filter.favorites_only {
                query.append_pair("isFavorite", "true");
            }
            if filter.on_sale_only {
                query.append_pair("onSale", "true");
            }
            if let Some(keyword) = filter.normalized_keyword() {
                query.append_pair("keyword", keyword);
            }
        }

        let raw: RawProductPage = self.execute(self.inner.client.get(url)).await?;
        Ok(convert_product_page(raw))
    }

    #[instrument(skip(self))]
    async fn list_stores(&self) -> Result<Vec<Store>, GatewayError> {
        if let Some(stores) = self.inner.stores_cache.get(STORES_CACHE_KEY).await {
            debug!("Cache hit for stores");
            return Ok(stores);
        }

        let url = self.endpoint("getStores")?;
        let raw: Vec<RawStore> = self.execute(self.inner.client.get(url)).await?;
        let stores = convert_stores(raw);

        self.inner
            .stores_cache
            .insert(STORES_CACHE_KEY.to_string(), stores.clone())
            .await;

        Ok(stores)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn list_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, GatewayError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint("products-by-ids")?;
        url.query_pairs_mut().append_pair("ids", &joined);

        let raw: Vec<RawProduct> = self.execute(self.inner.client.get(url)).await?;
        Ok(convert_products(raw))
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn set_favorite(&self, product_id: ProductId, favorite: bool) -> Result<(), GatewayError> {
        let (path, method) = if favorite {
            ("addFavorite", reqwest::Method::POST)
        } else {
            ("removeFavorite", reqwest::Method::DELETE)
        };

        let url = self.endpoint(path)?;
        let request = self
            .inner
            .client
            .request(method, url)
            .json(&serde_json::json!({ "productId": product_id }));

        // The body is an acknowledgment; only the status matters
        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        let config = FeedConfig::from_lookup(|key| match key {
            "OFERTA_API_URL" => Some(base.to_string()),
            _ => None,
        })
        .expect("test config");
        HttpGateway::new(&config)
    }

    #[test]
    fn test_endpoint_preserves_base_path() {
        let gateway = gateway("https://api.oferta.example/v1/");
        let url = gateway.endpoint("getStores").expect("endpoint");
        assert_eq!(url.as_str(), "https://api.oferta.example/v1/getStores");
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let gateway = gateway("https://api.oferta.example");
        let url = gateway.endpoint("getProducts").expect("endpoint");
        assert_eq!(url.as_str(), "https://api.oferta.example/getProducts");
    }
}
