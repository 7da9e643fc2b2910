//! Data models for products, user style profiles and outfit recommendations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A product listing normalized from any retailer source.
///
/// Instances are created fresh per fetch and never mutated after
/// normalization; scoring works on copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Globally unique, namespaced as `{retailer_id}_{native_or_hashed_id}`
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub colors: Vec<String>,
    pub style_tags: Vec<String>,
    pub occasions: Vec<String>,
    pub fit: String,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub retailer_id: String,
    pub image_urls: Vec<String>,
    pub url: String,
    pub sizes: Vec<String>,
    pub in_stock: bool,
    /// 0-1 score indicating how trending the item is
    pub trending_score: f64,
    #[serde(default)]
    pub description: String,
}

impl Product {
    /// Enforce the invariants downstream scoring relies on: a sale price is
    /// only kept when strictly below the regular price, and the attribute
    /// sets scoring divides by are never left empty.
    pub fn apply_fallbacks(&mut self) {
        if let Some(sale) = self.sale_price
            && sale >= self.price
        {
            self.sale_price = None;
        }
        if self.colors.is_empty() {
            self.colors.push("black".to_string());
        }
        if self.style_tags.is_empty() {
            self.style_tags.push("casual".to_string());
        }
        if self.occasions.is_empty() {
            self.occasions.push("casual".to_string());
        }
        if self.fit.is_empty() {
            self.fit = "regular".to_string();
        }
        self.trending_score = self.trending_score.clamp(0.0, 1.0);
    }
}

/// A product annotated with how well it matches the requesting user.
/// Recomputed per request, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: Product,
    pub match_score: f64,
    pub match_reasons: Vec<String>,
}

/// Weighted style preferences for one user, immutable within a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStyleProfile {
    pub user_id: String,
    /// style name -> weight in [0, 1]
    #[serde(default)]
    pub style_weights: HashMap<String, f64>,
    /// Styles the user named without weighting them
    #[serde(default)]
    pub preferred_styles: Vec<String>,
    #[serde(default)]
    pub color_weights: HashMap<String, f64>,
    #[serde(default)]
    pub fit_weights: HashMap<String, f64>,
    #[serde(default)]
    pub brand_weights: HashMap<String, f64>,
    #[serde(default)]
    pub preferred_categories: Vec<String>,
    #[serde(default)]
    pub preferred_occasions: Vec<String>,
    /// Hard negative filters: any overlap forces the floor score
    #[serde(default)]
    pub avoided_styles: Vec<String>,
    #[serde(default)]
    pub avoided_colors: Vec<String>,
}

/// One answer sheet from the style quiz, as supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswers {
    #[serde(default)]
    pub overall_styles: Vec<String>,
    #[serde(default)]
    pub color_palettes: Vec<String>,
    #[serde(default)]
    pub fits: Vec<String>,
    #[serde(default)]
    pub occasions: Vec<String>,
    #[serde(default)]
    pub favorite_brands: Vec<String>,
    #[serde(default)]
    pub avoided_styles: Vec<String>,
    #[serde(default)]
    pub avoided_colors: Vec<String>,
}

/// An item the user already owns, used to bias the profile toward what
/// they actually wear.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosetItem {
    pub category: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
}

/// A composed outfit suggestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub id: String,
    pub name: String,
    pub occasion: String,
    /// Ordered member product ids, at least 3 and at most 5
    pub item_ids: Vec<String>,
    /// Arithmetic mean of the member match scores
    pub score: f64,
    pub match_reasons: Vec<String>,
}

/// Inbound recommendation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub category: Option<String>,
    pub occasion: Option<String>,
    pub profile: Option<UserStyleProfile>,
    pub quiz: Option<QuizAnswers>,
    #[serde(default)]
    pub closet: Vec<ClosetItem>,
    pub retailer_ids: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub max_outfits: Option<usize>,
}

/// Outbound payload: ranked items plus composed outfits.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<ScoredProduct>,
    pub outfits: Vec<Outfit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_product() -> Product {
        Product {
            id: "test_1".to_string(),
            name: "Test Item".to_string(),
            brand: "Testbrand".to_string(),
            category: "tops".to_string(),
            subcategory: None,
            colors: vec![],
            style_tags: vec![],
            occasions: vec![],
            fit: String::new(),
            price: 40.0,
            sale_price: Some(50.0),
            retailer_id: "test".to_string(),
            image_urls: vec![],
            url: "https://example.com/p/1".to_string(),
            sizes: vec![],
            in_stock: true,
            trending_score: 1.7,
            description: String::new(),
        }
    }

    #[test]
    fn fallbacks_fill_empty_attribute_sets() {
        let mut product = bare_product();
        product.apply_fallbacks();

        assert_eq!(product.colors, vec!["black"]);
        assert_eq!(product.style_tags, vec!["casual"]);
        assert_eq!(product.occasions, vec!["casual"]);
        assert_eq!(product.fit, "regular");
    }

    #[test]
    fn sale_price_dropped_unless_below_price() {
        let mut product = bare_product();
        product.apply_fallbacks();
        assert_eq!(product.sale_price, None);

        let mut discounted = bare_product();
        discounted.sale_price = Some(29.99);
        discounted.apply_fallbacks();
        assert_eq!(discounted.sale_price, Some(29.99));
    }

    #[test]
    fn trending_score_clamped_to_unit_interval() {
        let mut product = bare_product();
        product.apply_fallbacks();
        assert!(product.trending_score <= 1.0);
    }
}
