//! Match scoring between products and user style profiles, plus the
//! item-to-item similarity routine used for "more like this" lookups.

use std::cmp::Ordering;

use crate::models::{Product, ScoredProduct, UserStyleProfile};

pub const STYLE_WEIGHT: f64 = 0.35;
pub const COLOR_WEIGHT: f64 = 0.20;
pub const FIT_WEIGHT: f64 = 0.15;
pub const OCCASION_WEIGHT: f64 = 0.20;
pub const BRAND_WEIGHT: f64 = 0.10;
pub const TRENDING_WEIGHT: f64 = 0.10;

const BASELINE: f64 = 0.5;
/// Fixed score for anything touching the avoided sets
const AVOIDED_SCORE: f64 = 0.2;
/// Credit for a style the user named but did not weight
const UNWEIGHTED_STYLE_CREDIT: f64 = 0.7;
/// Ranked pools drop anything at or below this
pub const RANK_THRESHOLD: f64 = 0.4;
const MAX_REASONS: usize = 3;

/// Score one product against a profile. Deterministic for fixed inputs and
/// always within [0, 1].
///
/// The score starts from a neutral baseline and blends in the weighted
/// average of whichever axes actually contributed, scaled by how much of
/// the total axis weight was in play — an item matching on two axes is
/// compared fairly against one matching on five. Any intersection with the
/// avoided styles or colors overrides everything with a fixed low score.
pub fn score(
    product: &Product,
    profile: &UserStyleProfile,
    occasion: Option<&str>,
) -> (f64, Vec<String>) {
    if hits_avoided(product, profile) {
        return (AVOIDED_SCORE, Vec::new());
    }

    // (axis score, axis weight) for contributing axes only
    let mut contributions: Vec<(f64, f64)> = Vec::new();
    let mut reasons: Vec<String> = Vec::new();

    // Style: average of the matched tags' user weights
    let mut style_scores: Vec<f64> = Vec::new();
    let mut matched_style = None;
    for tag in &product.style_tags {
        let tag = tag.to_lowercase();
        if let Some(weight) = profile.style_weights.get(&tag) {
            style_scores.push(*weight);
            matched_style.get_or_insert(tag);
        } else if profile.preferred_styles.iter().any(|s| *s == tag) {
            style_scores.push(UNWEIGHTED_STYLE_CREDIT);
            matched_style.get_or_insert(tag);
        }
    }
    if !style_scores.is_empty() {
        let avg = style_scores.iter().sum::<f64>() / style_scores.len() as f64;
        contributions.push((avg, STYLE_WEIGHT));
        if let Some(tag) = matched_style {
            reasons.push(format!("Matches your {tag} style preference"));
        }
    }

    // Color: fraction of the product's colors the user prefers
    let matched_colors: Vec<&String> = product
        .colors
        .iter()
        .filter(|color| profile.color_weights.contains_key(&color.to_lowercase()))
        .collect();
    if !matched_colors.is_empty() {
        let fraction = matched_colors.len() as f64 / product.colors.len() as f64;
        contributions.push((fraction, COLOR_WEIGHT));
        reasons.push(format!(
            "Matches your {} color preference",
            matched_colors[0].to_lowercase()
        ));
    }

    // Fit: the user's weight for this exact fit
    if let Some(weight) = profile.fit_weights.get(&product.fit.to_lowercase()) {
        contributions.push((*weight, FIT_WEIGHT));
        reasons.push(format!("Matches your preferred {} fit", product.fit));
    }

    // Occasion: binary against the requested context, or the user's
    // preferred occasions when the request has none
    let occasion_hit = match occasion {
        Some(context) => {
            let context = context.to_lowercase();
            product
                .occasions
                .iter()
                .any(|o| o.to_lowercase() == context)
                .then_some(context)
        }
        None => product
            .occasions
            .iter()
            .map(|o| o.to_lowercase())
            .find(|o| profile.preferred_occasions.iter().any(|p| p == o)),
    };
    if let Some(context) = occasion_hit {
        contributions.push((1.0, OCCASION_WEIGHT));
        reasons.push(format!("Great for {context} occasions"));
    }

    // Brand
    if let Some(weight) = profile.brand_weights.get(&product.brand.to_lowercase()) {
        contributions.push((*weight, BRAND_WEIGHT));
        reasons.push(format!("From {}, a brand you love", product.brand));
    }

    // Trending bonus
    if product.trending_score > 0.0 {
        contributions.push((product.trending_score, TRENDING_WEIGHT));
        if product.trending_score > 0.7 {
            reasons.push("Currently trending".to_string());
        }
    }

    let total_weight = STYLE_WEIGHT
        + COLOR_WEIGHT
        + FIT_WEIGHT
        + OCCASION_WEIGHT
        + BRAND_WEIGHT
        + TRENDING_WEIGHT;
    let contributing_weight: f64 = contributions.iter().map(|(_, w)| w).sum();

    let final_score = if contributing_weight > 0.0 {
        let axis_avg = contributions
            .iter()
            .map(|(score, weight)| score * weight)
            .sum::<f64>()
            / contributing_weight;
        let coverage = contributing_weight / total_weight;
        (BASELINE * (1.0 - coverage) + axis_avg * coverage).clamp(0.0, 1.0)
    } else {
        BASELINE
    };

    let mut unique = Vec::new();
    for reason in reasons {
        if !unique.contains(&reason) {
            unique.push(reason);
        }
        if unique.len() == MAX_REASONS {
            break;
        }
    }
    if unique.is_empty() {
        unique.push("Versatile addition to your wardrobe".to_string());
    }

    (final_score, unique)
}

fn hits_avoided(product: &Product, profile: &UserStyleProfile) -> bool {
    let style_hit = product.style_tags.iter().any(|tag| {
        let tag = tag.to_lowercase();
        profile.avoided_styles.iter().any(|avoided| *avoided == tag)
    });
    let color_hit = product.colors.iter().any(|color| {
        let color = color.to_lowercase();
        profile.avoided_colors.iter().any(|avoided| *avoided == color)
    });
    style_hit || color_hit
}

/// Similarity between a product and a fixed reference item. Used for
/// "similar items" lookups, not for profile matching.
pub fn similarity(product: &Product, reference: &Product) -> f64 {
    let mut score = 0.0;

    if product.category.eq_ignore_ascii_case(&reference.category) {
        score += 0.3;
    }
    if let (Some(a), Some(b)) = (&product.subcategory, &reference.subcategory)
        && a.eq_ignore_ascii_case(b)
    {
        score += 0.2;
    }

    let style_overlap = reference
        .style_tags
        .iter()
        .filter(|tag| {
            product
                .style_tags
                .iter()
                .any(|other| other.eq_ignore_ascii_case(tag))
        })
        .count();
    if style_overlap > 0 {
        score += 0.2 * (style_overlap as f64 / reference.style_tags.len().max(1) as f64);
    }

    let color_overlap = reference
        .colors
        .iter()
        .filter(|color| {
            product
                .colors
                .iter()
                .any(|other| other.eq_ignore_ascii_case(color))
        })
        .count();
    if color_overlap > 0 {
        score += 0.15 * (color_overlap as f64 / reference.colors.len().max(1) as f64);
    }

    if product.brand.eq_ignore_ascii_case(&reference.brand) {
        score += 0.1;
    }

    if product.price > 0.0 && reference.price > 0.0 {
        let ratio = (product.price.min(reference.price)) / (product.price.max(reference.price));
        if ratio > 0.7 {
            score += 0.05 * ratio;
        }
    }

    if score == 0.0 { 0.3 } else { score.min(1.0) }
}

/// Score a pool and rank it: filter to scores above the threshold, then a
/// stable descending sort so ties keep their discovery order.
pub fn rank(
    pool: &[Product],
    profile: &UserStyleProfile,
    occasion: Option<&str>,
) -> Vec<ScoredProduct> {
    let mut scored: Vec<ScoredProduct> = pool
        .iter()
        .map(|product| {
            let (match_score, match_reasons) = score(product, profile, occasion);
            ScoredProduct {
                product: product.clone(),
                match_score,
                match_reasons,
            }
        })
        .filter(|scored| scored.match_score > RANK_THRESHOLD)
        .collect();

    scored.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
    });
    scored
}

/// Items most similar to a reference, optionally blended with profile
/// personalization (70% similarity, 30% profile match).
pub fn similar_items(
    reference: &Product,
    pool: &[Product],
    profile: Option<&UserStyleProfile>,
    limit: usize,
) -> Vec<Product> {
    let mut scored: Vec<(f64, &Product)> = pool
        .iter()
        .filter(|candidate| candidate.id != reference.id)
        .map(|candidate| {
            let base = similarity(candidate, reference);
            let blended = match profile {
                Some(profile) => {
                    let (personal, _) = score(candidate, profile, None);
                    base * 0.7 + personal * 0.3
                }
                None => base,
            };
            (blended, candidate)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::default_profile;

    fn product(name: &str, category: &str) -> Product {
        Product {
            id: format!("test_{}", name.to_lowercase().replace(' ', "-")),
            name: name.to_string(),
            brand: "Fjell".to_string(),
            category: category.to_string(),
            subcategory: None,
            colors: vec!["black".to_string()],
            style_tags: vec!["casual".to_string(), "minimalist".to_string()],
            occasions: vec!["casual".to_string(), "work".to_string()],
            fit: "regular".to_string(),
            price: 60.0,
            sale_price: None,
            retailer_id: "test".to_string(),
            image_urls: vec![],
            url: String::new(),
            sizes: vec![],
            in_stock: true,
            trending_score: 0.5,
            description: String::new(),
        }
    }

    #[test]
    fn score_is_idempotent_and_bounded() {
        let profile = default_profile();
        let item = product("Black Tee", "tops");

        let (first, reasons_a) = score(&item, &profile, Some("casual"));
        let (second, reasons_b) = score(&item, &profile, Some("casual"));

        assert_eq!(first, second);
        assert_eq!(reasons_a, reasons_b);
        assert!((0.0..=1.0).contains(&first));
        assert!(reasons_a.len() <= 3);
    }

    #[test]
    fn avoided_style_forces_floor_score() {
        let mut profile = default_profile();
        profile.avoided_styles.push("minimalist".to_string());
        // Everything else matches strongly
        profile.style_weights.insert("casual".to_string(), 1.0);
        profile.color_weights.insert("black".to_string(), 1.0);

        let item = product("Black Tee", "tops");
        let (value, reasons) = score(&item, &profile, Some("casual"));

        assert_eq!(value, AVOIDED_SCORE);
        assert!(reasons.is_empty());
    }

    #[test]
    fn avoided_color_forces_floor_score() {
        let mut profile = default_profile();
        profile.avoided_colors.push("black".to_string());

        let (value, _) = score(&product("Black Tee", "tops"), &profile, None);
        assert_eq!(value, AVOIDED_SCORE);
    }

    #[test]
    fn matching_item_outranks_neutral_item() {
        let profile = default_profile();
        let matching = product("Black Tee", "tops");

        let mut neutral = product("Lime Windbreaker", "outerwear");
        neutral.colors = vec!["lime".to_string()];
        neutral.style_tags = vec!["loud".to_string()];
        neutral.occasions = vec!["festival".to_string()];
        neutral.fit = "boxy".to_string();
        neutral.brand = "Unknown".to_string();

        let (match_score, _) = score(&matching, &profile, Some("casual"));
        let (neutral_score, _) = score(&neutral, &profile, Some("casual"));
        assert!(match_score > neutral_score);
    }

    #[test]
    fn unweighted_preferred_style_gets_flat_credit() {
        let mut profile = default_profile();
        profile.style_weights.clear();
        profile.preferred_styles = vec!["minimalist".to_string()];

        let item = product("Plain Tee", "tops");
        let (with_credit, _) = score(&item, &profile, None);

        profile.preferred_styles.clear();
        let (without, _) = score(&item, &profile, None);
        assert!(with_credit > without);
    }

    #[test]
    fn rank_filters_threshold_and_sorts_descending() {
        let profile = default_profile();
        let mut avoided = product("Neon Hoodie", "tops");
        avoided.style_tags = vec!["neon".to_string()];
        let mut with_avoided_profile = profile.clone();
        with_avoided_profile.avoided_styles.push("neon".to_string());

        let pool = vec![product("Black Tee", "tops"), avoided];
        let ranked = rank(&pool, &with_avoided_profile, Some("casual"));

        // The avoided item scores 0.2 and falls below the 0.4 threshold
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].product.name, "Black Tee");
        for pair in ranked.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
        }
    }

    #[test]
    fn similarity_favors_same_category_and_brand() {
        let reference = product("Black Tee", "tops");
        let same = product("Black Henley", "tops");
        let mut other = product("Black Boots", "shoes");
        other.brand = "Someone Else".to_string();
        other.style_tags = vec!["rugged".to_string()];

        assert!(similarity(&same, &reference) > similarity(&other, &reference));
        assert!((0.0..=1.0).contains(&similarity(&same, &reference)));
    }

    #[test]
    fn similarity_defaults_when_nothing_matches() {
        let reference = product("Black Tee", "tops");
        let mut stranger = product("Red Clogs", "shoes");
        stranger.brand = "Nobody".to_string();
        stranger.colors = vec!["red".to_string()];
        stranger.style_tags = vec!["quirky".to_string()];
        stranger.price = 5.0;

        assert_eq!(similarity(&stranger, &reference), 0.3);
    }

    #[test]
    fn similar_items_excludes_the_reference_itself() {
        let reference = product("Black Tee", "tops");
        let pool = vec![
            reference.clone(),
            product("Black Henley", "tops"),
            product("Black Jeans", "bottoms"),
        ];

        let similar = similar_items(&reference, &pool, None, 5);
        assert_eq!(similar.len(), 2);
        assert!(similar.iter().all(|item| item.id != reference.id));
        assert_eq!(similar[0].name, "Black Henley");
    }
}
