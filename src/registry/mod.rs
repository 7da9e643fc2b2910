//! Per-retailer source configuration: selector tables, category URL
//! mapping and pagination rules.
//!
//! Each retailer is a data record consumed by the one generic parsing
//! routine, so the fallback chain (retailer-specific selectors -> generic
//! selectors -> broad heuristic) stays uniform across sources.

use std::collections::HashMap;
use url::Url;

use crate::error::StylistError;

/// CSS selectors for pulling product fields out of a listing page.
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    /// Container selector for individual products
    pub product_container: String,
    /// Name/title selector within the product container
    pub name: String,
    /// Regular price selector within the product container
    pub price: String,
    /// Sale/discounted price selector (optional)
    pub sale_price: Option<String>,
    /// Brand/vendor selector within the product container (optional)
    pub brand: Option<String>,
    /// Product link selector within the product container
    pub link: String,
    /// Image selector within the product container
    pub image: String,
    /// Sold out indicator selector (optional)
    pub sold_out: Option<String>,
}

impl SiteSelectors {
    /// Broad selector set that works on most storefront themes. Used when a
    /// retailer has no dedicated table, and as the second extraction tier
    /// when the dedicated table yields nothing.
    pub fn generic() -> Self {
        Self {
            product_container: ".product, .product-card, .product-item, li.grid__item".to_string(),
            name: ".product-title, .product-name, .card-title, h2 a, h3 a".to_string(),
            price: "[class*='price']".to_string(),
            sale_price: Some("[class*='sale'], [class*='discount'], del + ins".to_string()),
            brand: Some("[class*='brand'], [class*='vendor']".to_string()),
            link: "a".to_string(),
            image: "img".to_string(),
            sold_out: None,
        }
    }
}

/// How a retailer paginates its listing pages.
#[derive(Debug, Clone)]
pub enum Pagination {
    /// `?page=N` style. Replaces an existing parameter of the same name.
    QueryParam(String),
    /// `#page-N` style for storefronts that paginate via client-side offset.
    Fragment(String),
    /// `/page/N` style path segment.
    PathSegment(String),
}

/// Platform behind a retailer's API, when one is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Shopify,
    WooCommerce,
    GenericRest,
}

/// Static configuration for one retailer. Loaded at startup, read-only.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub retailer_id: String,
    pub retailer_name: String,
    pub platform: Option<Platform>,
    pub base_url: String,
    /// API root, e.g. `https://shop.example.com/admin/api/2024-01`
    pub api_url: Option<String>,
    pub selectors: SiteSelectors,
    /// Internal category vocabulary -> retailer path segment
    pub category_paths: HashMap<String, String>,
    pub pagination: Pagination,
    /// Brands this retailer plausibly stocks; feeds synthetic generation
    pub brand_pool: Vec<String>,
    pub max_pages: u32,
    pub page_delay_ms: u64,
    pub per_page: usize,
}

impl SourceConfig {
    /// Map an internal category and occasion context onto a listing URL.
    /// Unknown categories pass through unchanged as the path segment.
    pub fn category_url(&self, category: &str, occasion: Option<&str>) -> Result<Url, StylistError> {
        let segment = self
            .category_paths
            .get(category)
            .cloned()
            .unwrap_or_else(|| category.to_string());

        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), segment);
        let mut url = Url::parse(&raw)
            .map_err(|e| StylistError::parse(format!("category url for {}: {e}", self.retailer_id)))?;

        if let Some(occasion) = occasion {
            url.query_pairs_mut().append_pair("occasion", occasion);
        }
        Ok(url)
    }

    /// Full-text search URL for sources that expose one.
    pub fn search_url(&self, term: &str) -> String {
        format!(
            "{}/search?q={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(term)
        )
    }

    /// Apply this retailer's pagination rule. Page 1 (or below) is the base
    /// URL unchanged; repeated application never stacks two pagination
    /// parameters of the same name.
    pub fn page_url(&self, base: &Url, page: u32) -> Url {
        if page <= 1 {
            return base.clone();
        }
        let mut url = base.clone();
        match &self.pagination {
            Pagination::QueryParam(name) => {
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(k, _)| k != name.as_str())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                {
                    let mut pairs = url.query_pairs_mut();
                    pairs.clear();
                    for (k, v) in kept {
                        pairs.append_pair(&k, &v);
                    }
                    pairs.append_pair(name, &page.to_string());
                }
                url
            }
            Pagination::Fragment(prefix) => {
                url.set_fragment(Some(&format!("{prefix}{page}")));
                url
            }
            Pagination::PathSegment(segment) => {
                let mut parts: Vec<String> = url
                    .path_segments()
                    .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
                    .unwrap_or_default();
                // Replace a trailing /<segment>/<n> instead of appending another
                if parts.len() >= 2
                    && parts[parts.len() - 2] == *segment
                    && parts[parts.len() - 1].parse::<u32>().is_ok()
                {
                    parts.truncate(parts.len() - 2);
                }
                parts.push(segment.clone());
                parts.push(page.to_string());
                url.set_path(&format!("/{}", parts.join("/")));
                url
            }
        }
    }
}

/// Lookup table of retailer configs plus a generic fallback for unknown
/// sources. `resolve` never fails.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    configs: HashMap<String, SourceConfig>,
    fallback: SourceConfig,
}

fn category_table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn brand_pool(brands: &[&str]) -> Vec<String> {
    brands.iter().map(|b| b.to_string()).collect()
}

impl SourceRegistry {
    /// Registry preloaded with the retailers this deployment knows about.
    pub fn with_defaults() -> Self {
        let mut configs = HashMap::new();

        let nordic = SourceConfig {
            retailer_id: "nordic-thread".to_string(),
            retailer_name: "Nordic Thread".to_string(),
            platform: Some(Platform::Shopify),
            base_url: "https://www.nordicthread.com".to_string(),
            api_url: Some("https://www.nordicthread.com/admin/api/2024-01".to_string()),
            selectors: SiteSelectors {
                product_container: ".product-card-wrapper, li.grid__item".to_string(),
                name: ".card__heading a, .product-title a".to_string(),
                price: ".price-item--regular, .price__regular .price-item".to_string(),
                sale_price: Some(".price-item--sale, .price__sale .price-item".to_string()),
                brand: Some(".card__vendor".to_string()),
                link: ".card__heading a, a.full-unstyled-link".to_string(),
                image: ".card__media img, .responsive-image__image".to_string(),
                sold_out: Some(".badge--sold-out, .price--sold-out".to_string()),
            },
            category_paths: category_table(&[
                ("tops", "collections/tops"),
                ("bottoms", "collections/bottoms"),
                ("dresses", "collections/dresses"),
                ("outerwear", "collections/jackets-coats"),
                ("shoes", "collections/footwear"),
                ("accessories", "collections/accessories"),
            ]),
            pagination: Pagination::QueryParam("page".to_string()),
            brand_pool: brand_pool(&["Nordic Thread", "Fjell", "Varde", "Askel"]),
            max_pages: 10,
            page_delay_ms: 500,
            per_page: 50,
        };

        let atelier = SourceConfig {
            retailer_id: "atelier-marche".to_string(),
            retailer_name: "Atelier Marche".to_string(),
            platform: Some(Platform::WooCommerce),
            base_url: "https://www.ateliermarche.com".to_string(),
            api_url: Some("https://www.ateliermarche.com/wp-json/wc/v3".to_string()),
            selectors: SiteSelectors {
                product_container: "li.product, .wc-block-grid__product".to_string(),
                name: ".woocommerce-loop-product__title".to_string(),
                price: ".price .amount, .woocommerce-Price-amount".to_string(),
                sale_price: Some(".price ins .amount".to_string()),
                brand: None,
                link: "a.woocommerce-LoopProduct-link, a".to_string(),
                image: "img.attachment-woocommerce_thumbnail, img".to_string(),
                sold_out: Some(".outofstock-badge".to_string()),
            },
            category_paths: category_table(&[
                ("tops", "product-category/tops"),
                ("bottoms", "product-category/trousers"),
                ("dresses", "product-category/dresses"),
                ("outerwear", "product-category/outerwear"),
                ("shoes", "product-category/shoes"),
                ("accessories", "product-category/accessories"),
            ]),
            pagination: Pagination::PathSegment("page".to_string()),
            brand_pool: brand_pool(&["Atelier Marche", "Rue Claire", "Maison Pli", "Côte"]),
            max_pages: 8,
            page_delay_ms: 750,
            per_page: 40,
        };

        let loft = SourceConfig {
            retailer_id: "loft-and-found".to_string(),
            retailer_name: "Loft & Found".to_string(),
            platform: None,
            base_url: "https://www.loftandfound.com".to_string(),
            api_url: None,
            selectors: SiteSelectors {
                product_container: ".catalog-tile".to_string(),
                name: ".tile-name a".to_string(),
                price: ".tile-price".to_string(),
                sale_price: Some(".tile-price--markdown".to_string()),
                brand: Some(".tile-brand".to_string()),
                link: ".tile-link, a".to_string(),
                image: ".tile-image img".to_string(),
                sold_out: None,
            },
            category_paths: category_table(&[
                ("tops", "shop/tops"),
                ("bottoms", "shop/bottoms"),
                ("dresses", "shop/dresses"),
                ("outerwear", "shop/coats"),
                ("shoes", "shop/shoes"),
                ("accessories", "shop/extras"),
            ]),
            // Client-side offset pagination, the offset lives in the hash
            pagination: Pagination::Fragment("page-".to_string()),
            brand_pool: brand_pool(&["Loft & Found", "Harbor Lane", "Westmere", "Oak & Iron"]),
            max_pages: 6,
            page_delay_ms: 500,
            per_page: 36,
        };

        for config in [nordic, atelier, loft] {
            configs.insert(config.retailer_id.clone(), config);
        }

        Self {
            configs,
            fallback: Self::generic_fallback(),
        }
    }

    fn generic_fallback() -> SourceConfig {
        SourceConfig {
            retailer_id: "generic".to_string(),
            retailer_name: "Generic Retailer".to_string(),
            platform: None,
            base_url: "https://www.example-retailer.com".to_string(),
            api_url: None,
            selectors: SiteSelectors::generic(),
            category_paths: HashMap::new(),
            pagination: Pagination::QueryParam("page".to_string()),
            brand_pool: brand_pool(&["House Label", "Everline", "Form & Field"]),
            max_pages: 5,
            page_delay_ms: 1000,
            per_page: 24,
        }
    }

    /// Known config for the retailer, or the generic fallback profile.
    pub fn resolve(&self, retailer_id: &str) -> &SourceConfig {
        self.configs.get(retailer_id).unwrap_or(&self.fallback)
    }

    pub fn retailer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.configs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SourceRegistry {
        SourceRegistry::with_defaults()
    }

    #[test]
    fn unknown_retailer_resolves_to_fallback() {
        let registry = registry();
        let config = registry.resolve("no-such-shop");
        assert_eq!(config.retailer_id, "generic");
    }

    #[test]
    fn unknown_category_passes_through() {
        let registry = registry();
        let config = registry.resolve("nordic-thread");
        let url = config.category_url("swimwear", None).unwrap();
        assert!(url.path().ends_with("/swimwear"));
    }

    #[test]
    fn occasion_context_becomes_query_param() {
        let registry = registry();
        let config = registry.resolve("nordic-thread");
        let url = config.category_url("tops", Some("business")).unwrap();
        assert!(url.query().unwrap_or_default().contains("occasion=business"));
    }

    #[test]
    fn search_url_encodes_the_term() {
        let registry = registry();
        let config = registry.resolve("loft-and-found");
        assert_eq!(
            config.search_url("wool coat"),
            "https://www.loftandfound.com/search?q=wool%20coat"
        );
    }

    #[test]
    fn page_one_returns_base_unchanged() {
        let registry = registry();
        let config = registry.resolve("nordic-thread");
        let base = Url::parse("https://www.nordicthread.com/collections/tops").unwrap();
        assert_eq!(config.page_url(&base, 1), base);
        assert_eq!(config.page_url(&base, 0), base);
    }

    #[test]
    fn repeated_query_pagination_never_duplicates_param() {
        let registry = registry();
        let config = registry.resolve("nordic-thread");
        let base = Url::parse("https://www.nordicthread.com/collections/tops?sort=new").unwrap();

        let second = config.page_url(&base, 2);
        let third = config.page_url(&second, 3);

        let page_params: Vec<_> = third.query_pairs().filter(|(k, _)| k == "page").collect();
        assert_eq!(page_params.len(), 1);
        assert_eq!(page_params[0].1, "3");
        // Unrelated parameters survive
        assert!(third.query_pairs().any(|(k, v)| k == "sort" && v == "new"));
    }

    #[test]
    fn path_segment_pagination_replaces_existing_segment() {
        let registry = registry();
        let config = registry.resolve("atelier-marche");
        let base = Url::parse("https://www.ateliermarche.com/product-category/tops").unwrap();

        let second = config.page_url(&base, 2);
        assert!(second.path().ends_with("/page/2"));

        let third = config.page_url(&second, 3);
        assert!(third.path().ends_with("/page/3"));
        assert_eq!(third.path().matches("/page/").count(), 1);
    }

    #[test]
    fn fragment_pagination_overwrites_fragment() {
        let registry = registry();
        let config = registry.resolve("loft-and-found");
        let base = Url::parse("https://www.loftandfound.com/shop/tops").unwrap();

        let second = config.page_url(&base, 2);
        assert_eq!(second.fragment(), Some("page-2"));

        let fifth = config.page_url(&second, 5);
        assert_eq!(fifth.fragment(), Some("page-5"));
    }
}
