//! Feed assembly: merge, dedup, partition.
//!
//! A pure function from the notification product set and the fetched
//! pages to the final display order. No clock, no I/O, deterministic.

use std::collections::HashSet;

use oferta_core::ProductId;

use crate::types::{Product, ProductPage};

/// Section a feed entry belongs to.
///
/// Entries come out grouped; a consumer renders one header per
/// contiguous run of the same section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Spliced in from a push notification.
    FromNotification,
    /// Promotion currently active.
    OnSale,
    /// Promotion expired or not active.
    OffSale,
}

impl Section {
    /// Human-readable section header.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FromNotification => "from notification",
            Self::OnSale => "on sale",
            Self::OffSale => "expired",
        }
    }
}

/// One product in its display position.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub product: Product,
    pub section: Section,
}

/// Build the display sequence.
///
/// Order: notification products first (their placement wins over the
/// feed), then the flattened pages stably partitioned into on-sale and
/// off-sale. No product id appears twice, whatever the inputs.
#[must_use]
pub fn assemble(notification_products: &[Product], pages: &[ProductPage]) -> Vec<FeedEntry> {
    let mut seen: HashSet<ProductId> = HashSet::new();
    let mut entries = Vec::new();

    for product in notification_products {
        if seen.insert(product.product_id) {
            entries.push(FeedEntry {
                product: product.clone(),
                section: Section::FromNotification,
            });
        }
    }

    let mut on_sale = Vec::new();
    let mut off_sale = Vec::new();
    for product in pages.iter().flat_map(|page| &page.products) {
        if !seen.insert(product.product_id) {
            continue;
        }
        let entry = FeedEntry {
            product: product.clone(),
            section: if product.on_sale {
                Section::OnSale
            } else {
                Section::OffSale
            },
        };
        if product.on_sale {
            on_sale.push(entry);
        } else {
            off_sale.push(entry);
        }
    }

    entries.extend(on_sale);
    entries.extend(off_sale);
    entries
}
