//! Source orchestration: the per-(retailer, category) decision chain.
//!
//! Try the platform API when credentials exist, scrape when enabled, and
//! fall back to synthetic generation — the first source to yield a
//! non-empty result wins. Every attempt's failure is logged and swallowed;
//! `retailer_items` never errors.

mod api;
mod scrape;
mod synthetic;

pub use api::{ApiCredentials, PlatformApi};
pub use scrape::{PageScraper, dedup_by_id};
pub use synthetic::SyntheticGenerator;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::error::StylistError;
use crate::models::Product;
use crate::registry::SourceRegistry;
use crate::traits::{ProductSource, SourceKind};

/// Where a cell's products actually came from. The tagged result keeps the
/// fallback decision exhaustive and testable.
#[derive(Debug)]
pub enum SourceOutcome {
    Api(Vec<Product>),
    Scraped(Vec<Product>),
    Synthetic(Vec<Product>),
}

impl SourceOutcome {
    fn from_kind(kind: SourceKind, products: Vec<Product>) -> Self {
        match kind {
            SourceKind::Api => Self::Api(products),
            SourceKind::Scrape => Self::Scraped(products),
            SourceKind::Synthetic => Self::Synthetic(products),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Api(_) => "api",
            Self::Scraped(_) => "scrape",
            Self::Synthetic(_) => "synthetic",
        }
    }

    pub fn into_products(self) -> Vec<Product> {
        match self {
            Self::Api(products) | Self::Scraped(products) | Self::Synthetic(products) => products,
        }
    }
}

pub struct SourceOrchestrator {
    registry: Arc<SourceRegistry>,
    api: PlatformApi,
    chain: Vec<Box<dyn ProductSource>>,
    cache: TtlCache<Vec<Product>>,
}

impl SourceOrchestrator {
    /// Assemble the chain in priority order. The synthetic source is always
    /// last so the chain cannot come up empty.
    pub fn new(
        registry: Arc<SourceRegistry>,
        api: PlatformApi,
        scraper: Option<PageScraper>,
        synthetic: SyntheticGenerator,
        cache_ttl: Duration,
    ) -> Self {
        let mut chain: Vec<Box<dyn ProductSource>> = vec![Box::new(api.clone())];
        if let Some(scraper) = scraper {
            chain.push(Box::new(scraper));
        }
        chain.push(Box::new(synthetic));

        Self {
            registry,
            api,
            chain,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Products for one (retailer, category) cell, through the cache and
    /// the fallback chain. Never fails.
    pub async fn retailer_items(
        &self,
        retailer_id: &str,
        category: &str,
        occasion: Option<&str>,
    ) -> Vec<Product> {
        let cache_key = format!("{retailer_id}:{category}:{}", occasion.unwrap_or("-"));
        if let Some(cached) = self.cache.get(&cache_key) {
            info!(retailer_id, category, count = cached.len(), "cache hit");
            return cached;
        }

        let outcome = self.gather(retailer_id, category, occasion).await;
        let label = outcome.label();
        let products = dedup_by_id(outcome.into_products());
        info!(
            retailer_id,
            category,
            source = label,
            count = products.len(),
            "cell gathered"
        );
        self.cache.insert(cache_key, products.clone());
        products
    }

    async fn gather(
        &self,
        retailer_id: &str,
        category: &str,
        occasion: Option<&str>,
    ) -> SourceOutcome {
        let config = self.registry.resolve(retailer_id);

        for source in &self.chain {
            if !source.available(config) {
                continue;
            }
            match source.fetch(config, category, occasion).await {
                Ok(products) if !products.is_empty() => {
                    return SourceOutcome::from_kind(source.kind(), products);
                }
                Ok(_) => {
                    warn!(retailer_id, category, source = ?source.kind(), "source returned no items");
                }
                Err(e) => {
                    warn!(retailer_id, category, source = ?source.kind(), error = %e, "source failed");
                }
            }
        }

        // Synthetic is unconditional, so this only happens when the chain
        // was configured without it.
        warn!(
            retailer_id,
            category,
            error = %StylistError::SourceExhausted(retailer_id.to_string()),
            "no source produced items"
        );
        SourceOutcome::Synthetic(Vec::new())
    }

    /// Real-time stock check against the retailer's API, defaulting to
    /// available when no API is configured or the call fails.
    pub async fn check_availability(
        &self,
        retailer_id: &str,
        ids: &[String],
    ) -> HashMap<String, bool> {
        let config = self.registry.resolve(retailer_id);
        if self.api.is_configured(config) {
            self.api.check_availability(config, ids).await
        } else {
            ids.iter().map(|id| (id.clone(), true)).collect()
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }
}
