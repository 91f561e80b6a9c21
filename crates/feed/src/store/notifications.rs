//! The push-notification product set.
//!
//! Seeded with product ids from a notification payload, resolved to
//! full records through the gateway. Independent of any feed key and
//! never paginated; the assembler splices it to the top of the feed.

use tracing::{debug, warn};

use oferta_core::ProductId;

use crate::error::{FeedError, GatewayError};
use crate::gateway::ProductGateway;
use crate::types::Product;

use super::FeedStore;

/// Loading state of the notification product set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationStatus {
    /// No notification has seeded the set.
    #[default]
    Idle,
    /// Resolution of the seeded ids is in flight.
    Loading,
    /// Products resolved and available.
    Loaded,
    /// Resolution failed; the set is empty.
    Error,
}

#[derive(Debug, Default)]
pub(crate) struct NotificationSet {
    pub products: Vec<Product>,
    pub status: NotificationStatus,
    pub error: Option<GatewayError>,
    /// Bumped by every seed (and clear). A resolution carrying an older
    /// seed discards its result instead of overwriting the newer set.
    pub seed: u64,
}

impl<G: ProductGateway> FeedStore<G> {
    /// Seed the notification product set and resolve it.
    ///
    /// An empty id set clears it. A later call fully replaces the
    /// previous set: a resolution still in flight for an earlier seed
    /// is discarded on arrival, whenever it settles.
    ///
    /// # Errors
    ///
    /// Propagates the gateway failure; the set is left empty in
    /// [`NotificationStatus::Error`]. A superseded call returns `Ok`
    /// since its outcome no longer matters.
    pub async fn set_notification_ids(&self, ids: &[ProductId]) -> Result<(), FeedError> {
        if ids.is_empty() {
            let mut set = self.lock_notifications();
            set.seed += 1;
            set.products.clear();
            set.status = NotificationStatus::Idle;
            set.error = None;
            return Ok(());
        }

        let seed = {
            let mut set = self.lock_notifications();
            set.seed += 1;
            set.status = NotificationStatus::Loading;
            set.error = None;
            set.seed
        };

        let result = self.gateway().list_products_by_ids(ids).await;

        let mut set = self.lock_notifications();
        if set.seed != seed {
            debug!("discarding stale notification resolution");
            return Ok(());
        }

        match result {
            Ok(products) => {
                set.products = products;
                set.status = NotificationStatus::Loaded;
                set.error = None;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to resolve notification products");
                set.products = Vec::new();
                set.status = NotificationStatus::Error;
                set.error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// The resolved notification products, in notification order.
    #[must_use]
    pub fn notification_products(&self) -> Vec<Product> {
        self.lock_notifications().products.clone()
    }

    /// Loading state of the notification set.
    #[must_use]
    pub fn notification_status(&self) -> NotificationStatus {
        self.lock_notifications().status
    }

    /// The last resolution failure, while the set is in
    /// [`NotificationStatus::Error`].
    #[must_use]
    pub fn notification_error(&self) -> Option<GatewayError> {
        self.lock_notifications().error.clone()
    }
}
