//! The recommendation engine: one request in, scored items and composed
//! outfits out.
//!
//! Fetch and scoring work is stateless and parallel across
//! (retailer, category) cells; the bounded runner is the only
//! synchronization primitive. Source failures degrade down the fallback
//! chain, so the only error a caller can see is a malformed request.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::cache;
use crate::error::StylistError;
use crate::fetch::{self, Fetcher, run_bounded};
use crate::models::{
    Outfit, Product, RecommendationRequest, RecommendationResponse, ScoredProduct,
    UserStyleProfile,
};
use crate::outfits;
use crate::profile;
use crate::registry::SourceRegistry;
use crate::scoring;
use crate::sources::{
    ApiCredentials, PageScraper, PlatformApi, SourceOrchestrator, SyntheticGenerator, dedup_by_id,
};

#[derive(Debug, Clone)]
pub struct StylistConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub cache_ttl: Duration,
    pub scraping_enabled: bool,
    /// Seed for synthetic generation and trending jitter; fixed for tests
    pub synthetic_seed: u64,
    pub synthetic_per_cell: usize,
    pub max_concurrent_cells: usize,
    pub default_limit: usize,
    pub default_max_outfits: usize,
}

impl Default for StylistConfig {
    fn default() -> Self {
        Self {
            timeout: fetch::DEFAULT_TIMEOUT,
            max_retries: fetch::DEFAULT_MAX_RETRIES,
            cache_ttl: cache::DEFAULT_TTL,
            scraping_enabled: true,
            synthetic_seed: 42,
            synthetic_per_cell: 24,
            max_concurrent_cells: 8,
            default_limit: 20,
            default_max_outfits: 5,
        }
    }
}

pub struct Stylist {
    config: StylistConfig,
    orchestrator: Arc<SourceOrchestrator>,
}

impl Stylist {
    pub fn new(config: StylistConfig) -> Result<Self, StylistError> {
        Self::with_registry(config, Arc::new(SourceRegistry::with_defaults()))
    }

    pub fn with_registry(
        config: StylistConfig,
        registry: Arc<SourceRegistry>,
    ) -> Result<Self, StylistError> {
        let fetcher = Fetcher::new(config.timeout, config.max_retries)?;

        let credentials: HashMap<String, ApiCredentials> = registry
            .retailer_ids()
            .iter()
            .map(|id| (id.clone(), ApiCredentials::from_env(id)))
            .collect();
        let api = PlatformApi::new(fetcher.clone(), credentials);
        let scraper = config.scraping_enabled.then(|| PageScraper::new(fetcher));
        let synthetic = SyntheticGenerator::new(config.synthetic_seed, config.synthetic_per_cell);

        let orchestrator =
            SourceOrchestrator::new(registry, api, scraper, synthetic, config.cache_ttl);

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// Serve one recommendation request end-to-end.
    pub async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResponse, StylistError> {
        validate_request(&request)?;
        let profile = profile::resolve(&request)?;
        let occasion = request.occasion.clone();

        let retailer_ids = match &request.retailer_ids {
            Some(ids) => ids.clone(),
            None => self.orchestrator.registry().retailer_ids(),
        };
        let categories: Vec<String> = match &request.category {
            Some(category) => vec![category.clone()],
            None if !profile.preferred_categories.is_empty() => {
                profile.preferred_categories.clone()
            }
            None => vec!["tops".to_string(), "bottoms".to_string(), "shoes".to_string()],
        };

        let pool = self
            .gather_cells(&retailer_ids, &categories, occasion.as_deref())
            .await;
        let mut pool = dedup_by_id(pool);
        pool.retain(|product| product.in_stock);

        let ranked = scoring::rank(&pool, &profile, occasion.as_deref());
        info!(
            pool = pool.len(),
            ranked = ranked.len(),
            retailers = retailer_ids.len(),
            categories = categories.len(),
            "scored candidate pool"
        );

        let occasion_label = occasion.clone().unwrap_or_else(|| "casual".to_string());
        let max_outfits = request
            .max_outfits
            .unwrap_or(self.config.default_max_outfits);
        let outfits = outfits::compose(&ranked, &occasion_label, max_outfits);

        let limit = request.limit.unwrap_or(self.config.default_limit);
        let items: Vec<ScoredProduct> = ranked.into_iter().take(limit).collect();
        let items = self.filter_available(items).await;

        Ok(RecommendationResponse {
            user_id: profile.user_id.clone(),
            timestamp: Utc::now(),
            items,
            outfits,
            context: occasion,
        })
    }

    /// Outfit-completion mode: extend the caller's fixed base items into
    /// full outfits using candidates from the base items' retailers.
    pub async fn complete_outfit(
        &self,
        base: Vec<Product>,
        occasion: Option<String>,
        profile: Option<UserStyleProfile>,
    ) -> Result<Vec<Outfit>, StylistError> {
        if base.is_empty() {
            return Err(StylistError::Validation(
                "at least one base item is required".to_string(),
            ));
        }
        let profile = match profile {
            Some(profile) => {
                crate::profile::validate(&profile)?;
                profile
            }
            None => crate::profile::default_profile(),
        };

        let occasion = occasion
            .or_else(|| most_common_occasion(&base))
            .unwrap_or_else(|| "casual".to_string());

        let needed = outfits::missing_categories(&base, &occasion);
        if needed.is_empty() {
            return Ok(outfits::complete(&base, &[], &occasion));
        }

        let retailer_ids: Vec<String> = base
            .iter()
            .map(|item| item.retailer_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let pool = self
            .gather_cells(&retailer_ids, &needed, Some(&occasion))
            .await;
        let base_ids: HashSet<&str> = base.iter().map(|item| item.id.as_str()).collect();
        let mut pool = dedup_by_id(pool);
        pool.retain(|product| product.in_stock && !base_ids.contains(product.id.as_str()));

        let ranked = scoring::rank(&pool, &profile, Some(&occasion));
        Ok(outfits::complete(&base, &ranked, &occasion))
    }

    /// Items similar to a reference, drawn from the reference's retailer
    /// and category, optionally personalized.
    pub async fn similar_items(
        &self,
        reference: &Product,
        profile: Option<&UserStyleProfile>,
        limit: usize,
    ) -> Vec<Product> {
        let pool = self
            .orchestrator
            .retailer_items(&reference.retailer_id, &reference.category, None)
            .await;
        scoring::similar_items(reference, &pool, profile, limit)
    }

    /// Fan out over retailer x category cells through the bounded runner.
    /// Individual cell failures are captured per slot and never abort the
    /// batch; the cells themselves degrade internally and do not fail.
    async fn gather_cells(
        &self,
        retailer_ids: &[String],
        categories: &[String],
        occasion: Option<&str>,
    ) -> Vec<Product> {
        let mut tasks = Vec::new();
        for retailer_id in retailer_ids {
            for category in categories {
                let orchestrator = Arc::clone(&self.orchestrator);
                let retailer_id = retailer_id.clone();
                let category = category.clone();
                let occasion = occasion.map(str::to_string);
                tasks.push(async move {
                    Ok::<_, StylistError>(
                        orchestrator
                            .retailer_items(&retailer_id, &category, occasion.as_deref())
                            .await,
                    )
                });
            }
        }

        let results = run_bounded(tasks, self.config.max_concurrent_cells).await;
        let mut pool = Vec::new();
        for result in results {
            match result {
                Ok(products) => pool.extend(products),
                Err(e) => warn!(error = %e, "cell worker failed"),
            }
        }
        pool
    }

    async fn filter_available(&self, items: Vec<ScoredProduct>) -> Vec<ScoredProduct> {
        let mut by_retailer: HashMap<String, Vec<String>> = HashMap::new();
        for item in &items {
            by_retailer
                .entry(item.product.retailer_id.clone())
                .or_default()
                .push(item.product.id.clone());
        }

        let mut availability: HashMap<String, bool> = HashMap::new();
        for (retailer_id, ids) in by_retailer {
            availability.extend(self.orchestrator.check_availability(&retailer_id, &ids).await);
        }

        items
            .into_iter()
            .filter(|item| {
                availability
                    .get(&item.product.id)
                    .copied()
                    .unwrap_or(true)
            })
            .collect()
    }
}

fn validate_request(request: &RecommendationRequest) -> Result<(), StylistError> {
    if request.limit == Some(0) {
        return Err(StylistError::Validation(
            "limit must be greater than zero".to_string(),
        ));
    }
    if let Some(ids) = &request.retailer_ids
        && ids.is_empty()
    {
        return Err(StylistError::Validation(
            "retailerIds must not be empty when provided".to_string(),
        ));
    }
    Ok(())
}

fn most_common_occasion(base: &[Product]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in base {
        for occasion in &item.occasions {
            *counts.entry(occasion.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(occasion, _)| occasion.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_stylist() -> Stylist {
        Stylist::new(StylistConfig {
            scraping_enabled: false,
            synthetic_seed: 9,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn offline_request_is_served_from_synthetic_inventory() {
        let stylist = offline_stylist();
        let request = RecommendationRequest {
            category: Some("tops".to_string()),
            occasion: Some("business".to_string()),
            retailer_ids: Some(vec!["nordic-thread".to_string()]),
            ..Default::default()
        };

        let response = stylist.recommend(request).await.unwrap();

        assert!(!response.items.is_empty());
        for item in &response.items {
            assert_eq!(item.product.retailer_id, "nordic-thread");
            assert_eq!(item.product.category, "tops");
            assert!(item.match_score > scoring::RANK_THRESHOLD);
            assert!(item.match_score <= 1.0);
            assert!(item.match_reasons.len() <= 3);
        }
        // Ranked descending
        for pair in response.items.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
        }
    }

    #[tokio::test]
    async fn uncategorized_request_builds_outfits() {
        let stylist = offline_stylist();
        let response = stylist
            .recommend(RecommendationRequest {
                occasion: Some("business".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(!response.outfits.is_empty());
        for outfit in &response.outfits {
            assert!(outfit.item_ids.len() >= 3);
            assert!(outfit.item_ids.len() <= 5);
            assert!((0.0..=1.0).contains(&outfit.score));
        }
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let stylist = offline_stylist();
        let result = stylist
            .recommend(RecommendationRequest {
                limit: Some(0),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(StylistError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_retailer_list_is_rejected() {
        let stylist = offline_stylist();
        let result = stylist
            .recommend(RecommendationRequest {
                retailer_ids: Some(vec![]),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(StylistError::Validation(_))));
    }

    #[tokio::test]
    async fn completion_respects_existing_categories() {
        let stylist = offline_stylist();
        let base = vec![Product {
            id: "nordic-thread_base-tee".to_string(),
            name: "Base Tee".to_string(),
            brand: "Fjell".to_string(),
            category: "tops".to_string(),
            subcategory: None,
            colors: vec!["black".to_string()],
            style_tags: vec!["casual".to_string()],
            occasions: vec!["casual".to_string()],
            fit: "regular".to_string(),
            price: 30.0,
            sale_price: None,
            retailer_id: "nordic-thread".to_string(),
            image_urls: vec![],
            url: String::new(),
            sizes: vec![],
            in_stock: true,
            trending_score: 0.5,
            description: String::new(),
        }];

        let outfits = stylist
            .complete_outfit(base, Some("casual".to_string()), None)
            .await
            .unwrap();

        assert!(!outfits.is_empty());
        for outfit in &outfits {
            assert!(outfit.item_ids.contains(&"nordic-thread_base-tee".to_string()));
            // The base already covers tops; completions only add other cells
            let added_tops = outfit
                .item_ids
                .iter()
                .filter(|id| id.contains("syn-tops"))
                .count();
            assert_eq!(added_tops, 0);
        }
    }

    #[tokio::test]
    async fn empty_base_is_rejected() {
        let stylist = offline_stylist();
        let result = stylist.complete_outfit(vec![], None, None).await;
        assert!(matches!(result, Err(StylistError::Validation(_))));
    }

    #[tokio::test]
    async fn similar_items_come_from_the_same_retailer() {
        let stylist = offline_stylist();
        let response = stylist
            .recommend(RecommendationRequest {
                category: Some("shoes".to_string()),
                retailer_ids: Some(vec!["loft-and-found".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        let reference = response.items[0].product.clone();

        let similar = stylist.similar_items(&reference, None, 5).await;
        assert!(!similar.is_empty());
        assert!(similar.iter().all(|item| item.retailer_id == "loft-and-found"));
        assert!(similar.iter().all(|item| item.id != reference.id));
    }
}
