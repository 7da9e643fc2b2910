//! Platform API source.
//!
//! One HTTP GET per page with platform-specific query parameters and auth,
//! and a platform-specific "are there more pages" signal: Shopify announces
//! a next page through the `Link` header, WooCommerce reports
//! `X-WP-TotalPages`, and everything else falls back to the short-page
//! heuristic.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use crate::error::StylistError;
use crate::fetch::Fetcher;
use crate::models::Product;
use crate::normalize::parse_platform_payload;
use crate::registry::{Platform, SourceConfig};
use crate::traits::{ProductSource, SourceKind};

/// Per-retailer API credentials, read from the environment:
/// `STYLIST_<RETAILER>_API_KEY` / `STYLIST_<RETAILER>_API_SECRET`
/// with `-` mapped to `_`.
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl ApiCredentials {
    pub fn from_env(retailer_id: &str) -> Self {
        let prefix = format!(
            "STYLIST_{}",
            retailer_id.to_uppercase().replace('-', "_")
        );
        Self {
            api_key: std::env::var(format!("{prefix}_API_KEY")).ok(),
            api_secret: std::env::var(format!("{prefix}_API_SECRET")).ok(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

#[derive(Clone)]
pub struct PlatformApi {
    fetcher: Fetcher,
    credentials: HashMap<String, ApiCredentials>,
}

impl PlatformApi {
    pub fn new(fetcher: Fetcher, credentials: HashMap<String, ApiCredentials>) -> Self {
        Self {
            fetcher,
            credentials,
        }
    }

    /// Whether this retailer has both a configured platform and credentials.
    pub fn is_configured(&self, config: &SourceConfig) -> bool {
        config.platform.is_some()
            && config.api_url.is_some()
            && self
                .credentials
                .get(&config.retailer_id)
                .is_some_and(ApiCredentials::is_configured)
    }

    /// Fetch every page of one (retailer, category) cell through the
    /// platform API.
    pub async fn fetch_category(
        &self,
        config: &SourceConfig,
        category: &str,
    ) -> Result<Vec<Product>, StylistError> {
        let (Some(platform), Some(api_url)) = (config.platform, config.api_url.as_deref()) else {
            return Err(StylistError::SourceExhausted(config.retailer_id.clone()));
        };
        let credentials = self
            .credentials
            .get(&config.retailer_id)
            .cloned()
            .unwrap_or_default();

        let mut products = Vec::new();
        let mut page: u32 = 1;

        loop {
            let url = page_request_url(api_url, platform, category, page, config.per_page, &credentials);
            let headers = auth_headers(platform, &credentials);

            let (payload, response_headers) = self.fetcher.get_json(&url, &headers).await?;
            let page_products =
                parse_platform_payload(config, platform, &payload, Some(category));
            let page_len = page_products.len();
            products.extend(page_products);

            let more = has_more_pages(platform, &response_headers, page, page_len, config.per_page);
            debug!(
                retailer = %config.retailer_id,
                page,
                fetched = page_len,
                more,
                "api page complete"
            );

            if !more || page >= config.max_pages {
                break;
            }
            page += 1;
        }

        Ok(products)
    }

    /// Real-time stock check. Degrades to "available" for every id the
    /// endpoint fails to answer for; never errors.
    pub async fn check_availability(
        &self,
        config: &SourceConfig,
        ids: &[String],
    ) -> HashMap<String, bool> {
        let mut result: HashMap<String, bool> = ids.iter().map(|id| (id.clone(), true)).collect();
        let Some(api_url) = config.api_url.as_deref() else {
            return result;
        };
        let Some(platform) = config.platform else {
            return result;
        };

        // Native ids go over the wire without the retailer prefix
        let prefix = format!("{}_", config.retailer_id);
        let native_ids: Vec<&str> = ids
            .iter()
            .map(|id| id.strip_prefix(&prefix).unwrap_or(id))
            .collect();

        let credentials = self
            .credentials
            .get(&config.retailer_id)
            .cloned()
            .unwrap_or_default();
        let url = format!(
            "{}/availability?ids={}",
            api_url.trim_end_matches('/'),
            native_ids.join(",")
        );

        match self
            .fetcher
            .get_json(&url, &auth_headers(platform, &credentials))
            .await
        {
            Ok((payload, _)) => {
                for (id, native) in ids.iter().zip(native_ids) {
                    if let Some(available) = payload.get(native).and_then(|entry| {
                        entry
                            .as_bool()
                            .or_else(|| entry.get("available").and_then(|v| v.as_bool()))
                    }) {
                        result.insert(id.clone(), available);
                    }
                }
            }
            Err(e) => {
                warn!(retailer = %config.retailer_id, error = %e, "availability check failed, assuming in stock");
            }
        }
        result
    }
}

#[async_trait]
impl ProductSource for PlatformApi {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn available(&self, config: &SourceConfig) -> bool {
        self.is_configured(config)
    }

    async fn fetch(
        &self,
        config: &SourceConfig,
        category: &str,
        _occasion: Option<&str>,
    ) -> Result<Vec<Product>, StylistError> {
        self.fetch_category(config, category).await
    }
}

fn page_request_url(
    api_url: &str,
    platform: Platform,
    category: &str,
    page: u32,
    per_page: usize,
    credentials: &ApiCredentials,
) -> String {
    let api_url = api_url.trim_end_matches('/');
    match platform {
        Platform::Shopify => format!(
            "{api_url}/products.json?limit={per_page}&page={page}&product_type={}",
            urlencoding::encode(category)
        ),
        Platform::WooCommerce => {
            // WooCommerce authenticates through query parameters
            let mut url = format!(
                "{api_url}/products?per_page={per_page}&page={page}&status=publish&category={}",
                urlencoding::encode(category)
            );
            if let (Some(key), Some(secret)) =
                (credentials.api_key.as_deref(), credentials.api_secret.as_deref())
            {
                url.push_str(&format!("&consumer_key={key}&consumer_secret={secret}"));
            }
            url
        }
        Platform::GenericRest => format!(
            "{api_url}/products?limit={per_page}&page={page}&category={}",
            urlencoding::encode(category)
        ),
    }
}

fn auth_headers(platform: Platform, credentials: &ApiCredentials) -> Vec<(String, String)> {
    let Some(key) = credentials.api_key.as_deref() else {
        return Vec::new();
    };
    match platform {
        Platform::Shopify => vec![("X-Shopify-Access-Token".to_string(), key.to_string())],
        // Credentials already travel in the query string
        Platform::WooCommerce => Vec::new(),
        Platform::GenericRest => {
            vec![("Authorization".to_string(), format!("Bearer {key}"))]
        }
    }
}

fn has_more_pages(
    platform: Platform,
    headers: &HeaderMap,
    current_page: u32,
    page_len: usize,
    per_page: usize,
) -> bool {
    if page_len == 0 {
        return false;
    }
    match platform {
        Platform::Shopify => headers
            .get("link")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|link| link.contains("rel=\"next\"")),
        Platform::WooCommerce => headers
            .get("x-wp-totalpages")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u32>().ok())
            .is_some_and(|total| current_page < total),
        Platform::GenericRest => page_len >= per_page,
    }
}
