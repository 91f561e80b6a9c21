//! Error types for the feed cache and its fetch gateway.
//!
//! Gateway failures are recorded on the feed state and surfaced as a
//! retryable error; mutation failures revert the optimistic flip. No
//! error here is fatal to the consumer.

use oferta_core::ProductId;
use thiserror::Error;

/// Errors returned by a [`crate::gateway::ProductGateway`].
///
/// `Clone` so a failure can be both recorded on the feed state (for the
/// presentation layer to display) and returned to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport or connectivity failure.
    #[error("network error: {0}")]
    Network(String),

    /// Identity rejected by the server.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Resource not found (e.g., a stale page token).
    #[error("not found: {0}")]
    NotFound(String),

    /// The server rejected the request as malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The server responded with a payload this client cannot decode.
    #[error("malformed server payload: {0}")]
    Parse(String),
}

/// Errors surfaced by [`crate::store::FeedStore`] operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The underlying gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A mutation was requested before the user identity was resolved.
    ///
    /// The caller is expected to (re)initialize the session through the
    /// identity collaborator and retry.
    #[error("identity not ready: resolve the session before mutating")]
    IdentityNotReady,

    /// The product is not present in the active feed.
    #[error("product {0} is not in the active feed")]
    UnknownProduct(ProductId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = GatewayError::NotFound("page token expired".to_string());
        assert_eq!(err.to_string(), "not found: page token expired");
    }

    #[test]
    fn test_feed_error_is_transparent_for_gateway() {
        let err = FeedError::from(GatewayError::Network("connection refused".to_string()));
        assert_eq!(err.to_string(), "network error: connection refused");
    }

    #[test]
    fn test_unknown_product_names_the_id() {
        let err = FeedError::UnknownProduct(ProductId::new(99));
        assert_eq!(err.to_string(), "product 99 is not in the active feed");
    }
}
