//! Oferta Feed - paginated product feed cache.
//!
//! # Architecture
//!
//! - The server is the source of truth; this crate holds a working copy
//!   of the promotional feed, one independent page sequence per filter
//!   combination
//! - All network access goes through the [`gateway::ProductGateway`]
//!   trait; the bundled [`gateway::HttpGateway`] talks to the Oferta
//!   REST API with `reqwest`
//! - Favorite toggles are optimistic: the in-memory feed flips first,
//!   the server call follows, and a failed call reverts the flip to
//!   the pre-toggle value
//!
//! # Example
//!
//! ```rust,ignore
//! use oferta_feed::{FeedConfig, FeedStore, FilterParams, gateway::HttpGateway};
//!
//! let config = FeedConfig::from_env()?;
//! let store = FeedStore::new(HttpGateway::new(&config));
//!
//! let filter = FilterParams {
//!     user_id: Some(UserId::new(7)),
//!     ..FilterParams::default()
//! };
//!
//! store.ensure_loaded(&filter).await?;
//! store.fetch_next_page(&filter).await?;
//!
//! for entry in store.assembled(&filter) {
//!     println!("[{}] {}", entry.section.label(), entry.product.description);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod assemble;
pub mod config;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod store;
pub mod types;

pub use assemble::{FeedEntry, Section, assemble};
pub use config::{ConfigError, FeedConfig};
pub use error::{FeedError, GatewayError};
pub use filter::{FeedKey, FilterParams, MIN_KEYWORD_LEN};
pub use store::{FeedStatus, FeedStore, FeedView, NotificationStatus};
pub use types::{PageToken, Product, ProductPage, Store};
