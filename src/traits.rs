//! Trait seam between the orchestrator and its product sources

use async_trait::async_trait;

use crate::error::StylistError;
use crate::models::Product;
use crate::registry::SourceConfig;

/// Which rung of the fallback chain a source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Api,
    Scrape,
    Synthetic,
}

/// A way of obtaining products for one (retailer, category) cell.
///
/// Implementations must degrade internally where they can; an `Err` from
/// `fetch` moves the orchestrator on to the next source in the chain and is
/// never surfaced to the caller.
#[async_trait]
pub trait ProductSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Whether this source can serve the retailer at all.
    fn available(&self, config: &SourceConfig) -> bool {
        let _ = config;
        true
    }

    /// Fetch the cell's products.
    ///
    /// # Returns
    /// * `Result<Vec<Product>>` - normalized products, or the error that
    ///   moves the chain along
    async fn fetch(
        &self,
        config: &SourceConfig,
        category: &str,
        occasion: Option<&str>,
    ) -> Result<Vec<Product>, StylistError>;
}
