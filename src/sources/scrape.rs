//! Storefront scraping source.
//!
//! Page 1 is fetched serially to learn how deep the listing goes; the
//! remaining pages go through the bounded runner with a politeness delay
//! before every page beyond the first. Failed pages are logged and skipped,
//! never fatal for the batch.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::StylistError;
use crate::fetch::{Fetcher, run_bounded};
use crate::models::Product;
use crate::normalize::parse_listing;
use crate::registry::SourceConfig;
use crate::traits::{ProductSource, SourceKind};

const MAX_CONCURRENT_PAGES: usize = 4;

#[derive(Clone)]
pub struct PageScraper {
    fetcher: Fetcher,
}

impl PageScraper {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Scrape one (retailer, category) cell across its listing pages.
    pub async fn fetch_category(
        &self,
        config: &SourceConfig,
        category: &str,
        occasion: Option<&str>,
    ) -> Result<Vec<Product>, StylistError> {
        let base = config.category_url(category, occasion)?;

        let html = self.fetcher.get_text(base.as_str()).await?;
        let first = parse_listing(config, &html, base.as_str(), Some(category))?;
        let mut products = first.products;

        let total_pages = first.total_pages.unwrap_or(1).min(config.max_pages);
        if total_pages > 1 {
            info!(
                retailer = %config.retailer_id,
                category,
                total_pages,
                "paginating listing"
            );

            let tasks: Vec<_> = (2..=total_pages)
                .map(|page| {
                    let fetcher = self.fetcher.clone();
                    let config = config.clone();
                    let base = base.clone();
                    let category = category.to_string();
                    let delay = Duration::from_millis(config.page_delay_ms);
                    async move {
                        tokio::time::sleep(delay).await;
                        let url = config.page_url(&base, page);
                        let html = fetcher.get_text(url.as_str()).await?;
                        let parsed = parse_listing(&config, &html, url.as_str(), Some(&category))?;
                        Ok(parsed.products)
                    }
                })
                .collect();

            let results = run_bounded(tasks, MAX_CONCURRENT_PAGES).await;
            for (index, result) in results.into_iter().enumerate() {
                match result {
                    Ok(page_products) => products.extend(page_products),
                    Err(e) => {
                        warn!(
                            retailer = %config.retailer_id,
                            page = index + 2,
                            error = %e,
                            "listing page failed, skipping"
                        );
                    }
                }
            }
        }

        Ok(dedup_by_id(products))
    }
}

#[async_trait]
impl ProductSource for PageScraper {
    fn kind(&self) -> SourceKind {
        SourceKind::Scrape
    }

    async fn fetch(
        &self,
        config: &SourceConfig,
        category: &str,
        occasion: Option<&str>,
    ) -> Result<Vec<Product>, StylistError> {
        self.fetch_category(config, category, occasion).await
    }
}

/// Collapse duplicates by product id, first seen wins.
pub fn dedup_by_id(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|product| seen.insert(product.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;
    use crate::sources::synthetic::SyntheticGenerator;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let registry = SourceRegistry::with_defaults();
        let config = registry.resolve("nordic-thread");
        let mut products = SyntheticGenerator::new(5, 24).generate(config, "tops", 4);

        let mut duplicate = products[0].clone();
        duplicate.name = "Different Name, Same Id".to_string();
        products.push(duplicate);

        let deduped = dedup_by_id(products);
        assert_eq!(deduped.len(), 4);
        assert_ne!(deduped[0].name, "Different Name, Same Id");
    }
}
