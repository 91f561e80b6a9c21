//! Optimistic favorite toggles.
//!
//! The flip is applied to every occurrence in the feed synchronously,
//! before the server call is issued, so the UI never shows stale
//! favorite state. A failed call reverts the flip from the recorded
//! pre-toggle value; everything else about the feed, including pages
//! fetched while the call was in flight, is left untouched.
//!
//! Racing toggles on the same product: the first caller drives the
//! server calls; later toggles before settlement only flip the local
//! copy and update the recorded intent. The driver keeps issuing calls
//! until the server matches the latest intent - latest intent wins,
//! last response authoritative.

use std::collections::hash_map::Entry;
use std::time::Instant;

use tracing::{debug, warn};

use oferta_core::ProductId;

use crate::error::FeedError;
use crate::filter::FilterParams;
use crate::gateway::ProductGateway;

use super::{FeedStore, PendingToggle};

impl<G: ProductGateway> FeedStore<G> {
    /// Toggle the favorite flag of a product in this filter's feed.
    ///
    /// Requires a resolved identity (`filter.user_id`); without one the
    /// feed is untouched and the caller should resolve the session
    /// first.
    ///
    /// Returns once the toggle has settled. When this toggle merely
    /// supersedes one still in flight it returns immediately; the
    /// outcome is then reported to the original caller.
    ///
    /// # Errors
    ///
    /// - [`FeedError::IdentityNotReady`] when no user is resolved
    /// - [`FeedError::UnknownProduct`] when the product is not in the
    ///   feed
    /// - the gateway failure after the flip has been reverted, when
    ///   the server call fails
    pub async fn toggle_favorite(
        &self,
        filter: &FilterParams,
        product_id: ProductId,
    ) -> Result<(), FeedError> {
        if filter.user_id.is_none() {
            return Err(FeedError::IdentityNotReady);
        }

        let key = filter.feed_key();
        let pending_key = (key.clone(), product_id);

        // Optimistic flip, synchronous and complete before any await.
        let drives = {
            let mut guard = self.lock();
            let inner = &mut *guard;

            let state = inner
                .states
                .get_mut(&key)
                .ok_or(FeedError::UnknownProduct(product_id))?;
            let current = state
                .favorite_state(product_id)
                .ok_or(FeedError::UnknownProduct(product_id))?;
            let target = !current;

            let generation = state.generation;
            state.set_favorite(product_id, target);
            state.last_used = Instant::now();

            match inner.pending.entry(pending_key.clone()) {
                Entry::Occupied(mut entry) => {
                    // Supersede the in-flight toggle; its driver will
                    // reconcile to this target.
                    entry.get_mut().target = target;
                    debug!(%key, %product_id, target, "superseding in-flight favorite toggle");
                    false
                }
                Entry::Vacant(entry) => {
                    entry.insert(PendingToggle {
                        original: current,
                        generation,
                        target,
                    });
                    true
                }
            }
        };

        if !drives {
            return Ok(());
        }

        // Drive server calls until the confirmed state matches the
        // latest intent. The lock is released around every call.
        loop {
            let Some(target) = self
                .lock()
                .pending
                .get(&pending_key)
                .map(|pending| pending.target)
            else {
                return Ok(());
            };

            let result = self.gateway().set_favorite(product_id, target).await;

            let mut guard = self.lock();
            let inner = &mut *guard;
            match result {
                Ok(()) => {
                    let settled = inner
                        .pending
                        .get(&pending_key)
                        .is_none_or(|pending| pending.target == target);
                    if settled {
                        inner.pending.remove(&pending_key);
                        return Ok(());
                    }
                    // Superseded while the call was in flight; go again.
                    debug!(%key, %product_id, "favorite intent changed mid-flight, re-issuing");
                }
                Err(err) => {
                    warn!(%key, %product_id, error = %err, "favorite toggle failed, rolling back");
                    if let Some(pending) = inner.pending.remove(&pending_key)
                        && let Some(state) = inner.states.get_mut(&key)
                        && state.generation == pending.generation
                    {
                        // Revert only the flip. Pages fetched while the
                        // call was in flight stay, as does the status.
                        state.set_favorite(product_id, pending.original);
                    }
                    return Err(err.into());
                }
            }
        }
    }
}
