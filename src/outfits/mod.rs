//! Outfit composition: category-balanced bundles built from a scored
//! candidate pool.
//!
//! Essential slots (top, bottom, footwear) are filled with the best unused
//! candidate per slot; a dress replaces top and bottom outright and the two
//! never appear together. Accessories are opportunistic, outerwear only
//! joins when the occasion implies layering or formality.

use std::collections::HashSet;

use crate::models::{Outfit, Product, ScoredProduct};

const ESSENTIAL_CATEGORIES: [&str; 3] = ["tops", "bottoms", "shoes"];
/// Occasions that justify an outerwear slot
const LAYERED_OCCASIONS: [&str; 5] = ["business", "formal", "date night", "evening", "winter"];
const MIN_MEMBERS: usize = 3;
const MAX_MEMBERS: usize = 5;
const COMPLETION_VARIATIONS: usize = 3;

/// Compose up to `max_outfits` outfits from a ranked pool. Each candidate
/// is used at most once across the returned outfits.
pub fn compose(pool: &[ScoredProduct], occasion: &str, max_outfits: usize) -> Vec<Outfit> {
    let mut used: HashSet<&str> = HashSet::new();
    let mut outfits = Vec::new();

    for _ in 0..max_outfits {
        let Some(outfit) = compose_one(pool, occasion, &mut used) else {
            break;
        };
        outfits.push(outfit);
    }

    outfits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    outfits.truncate(max_outfits);
    outfits
}

fn compose_one<'a>(
    pool: &'a [ScoredProduct],
    occasion: &str,
    used: &mut HashSet<&'a str>,
) -> Option<Outfit> {
    let mut members: Vec<&'a ScoredProduct> = Vec::new();

    // A dress claims the top and bottom slots in one piece. Only considered
    // while no essential slot is filled, which up here is always true.
    let essential_slots: &[&str] = if let Some(dress) = best_unused(pool, "dresses", used) {
        members.push(dress);
        used.insert(&dress.product.id);
        &["shoes"]
    } else {
        &ESSENTIAL_CATEGORIES
    };

    for slot in essential_slots {
        if let Some(candidate) = best_unused(pool, slot, used) {
            members.push(candidate);
            used.insert(&candidate.product.id);
        }
    }

    // One accessory, opportunistically
    if members.len() < MAX_MEMBERS
        && let Some(accessory) = best_unused(pool, "accessories", used)
    {
        members.push(accessory);
        used.insert(&accessory.product.id);
    }

    // Outerwear only when the occasion calls for a layer
    let layered = LAYERED_OCCASIONS
        .iter()
        .any(|l| l.eq_ignore_ascii_case(occasion));
    if layered
        && members.len() < MAX_MEMBERS
        && let Some(outer) = best_unused(pool, "outerwear", used)
    {
        members.push(outer);
        used.insert(&outer.product.id);
    }

    if members.len() < MIN_MEMBERS {
        // Release the claimed candidates; a partial outfit helps nobody
        for member in &members {
            used.remove(member.product.id.as_str());
        }
        return None;
    }

    Some(build_outfit(&members, occasion))
}

fn best_unused<'a>(
    pool: &'a [ScoredProduct],
    category: &str,
    used: &HashSet<&'a str>,
) -> Option<&'a ScoredProduct> {
    pool.iter()
        .filter(|candidate| candidate.product.category.eq_ignore_ascii_case(category))
        .find(|candidate| !used.contains(candidate.product.id.as_str()))
}

fn build_outfit(members: &[&ScoredProduct], occasion: &str) -> Outfit {
    let item_ids: Vec<String> = members
        .iter()
        .map(|member| member.product.id.clone())
        .collect();
    let score =
        members.iter().map(|member| member.match_score).sum::<f64>() / members.len() as f64;

    let has_dress = members
        .iter()
        .any(|member| member.product.category.eq_ignore_ascii_case("dresses"));
    let outfit_type = if has_dress { "dress look" } else { "separates" };

    let id = format!("outfit_{:x}", md5::compute(item_ids.join("+")));
    Outfit {
        id: id[..14.min(id.len())].to_string(),
        name: format!("{} look", title_word(occasion)),
        occasion: occasion.to_string(),
        item_ids,
        score,
        match_reasons: vec![
            format!("Complete {outfit_type} for {occasion}"),
            "Coordinated around your style preferences".to_string(),
        ],
    }
}

/// Categories an outfit for this occasion still needs, given what the base
/// items already cover.
pub fn missing_categories(base: &[Product], occasion: &str) -> Vec<String> {
    let existing: HashSet<String> = base
        .iter()
        .flat_map(|item| {
            let mut categories = vec![item.category.to_lowercase()];
            if let Some(sub) = &item.subcategory {
                categories.push(sub.to_lowercase());
            }
            categories
        })
        .collect();

    let mut needed: Vec<String> = ESSENTIAL_CATEGORIES
        .iter()
        .map(|c| c.to_string())
        .collect();
    if LAYERED_OCCASIONS
        .iter()
        .any(|l| l.eq_ignore_ascii_case(occasion))
    {
        needed.push("accessories".to_string());
    }
    // A dress in the base stands in for top and bottom
    if existing.contains("dresses") {
        needed.retain(|category| category != "tops" && category != "bottoms");
    }

    needed.retain(|category| !existing.contains(category));
    needed
}

/// Completion mode: extend a fixed base item set into full outfits. Builds
/// up to three variations, variation `i` taking the i-th best candidate per
/// missing category.
pub fn complete(base: &[Product], pool: &[ScoredProduct], occasion: &str) -> Vec<Outfit> {
    if base.is_empty() {
        return Vec::new();
    }

    let needed = missing_categories(base, occasion);
    let base_ids: Vec<String> = base.iter().map(|item| item.id.clone()).collect();

    if needed.is_empty() {
        // Nothing to add; the base is already a complete outfit
        let id = format!("outfit_{:x}", md5::compute(base_ids.join("+")));
        return vec![Outfit {
            id: id[..14.min(id.len())].to_string(),
            name: format!("{} look", title_word(occasion)),
            occasion: occasion.to_string(),
            item_ids: base_ids,
            score: 1.0,
            match_reasons: vec![format!("Complete outfit for {occasion}")],
        }];
    }

    let mut outfits = Vec::new();
    for variation in 0..COMPLETION_VARIATIONS {
        let mut members: Vec<&ScoredProduct> = Vec::new();
        for category in &needed {
            let candidate = pool
                .iter()
                .filter(|candidate| {
                    candidate.product.category.eq_ignore_ascii_case(category)
                        && !base_ids.contains(&candidate.product.id)
                })
                .nth(variation);
            if let Some(candidate) = candidate {
                members.push(candidate);
            }
        }

        if base.len() + members.len() < MIN_MEMBERS || members.is_empty() {
            continue;
        }

        let mut item_ids = base_ids.clone();
        item_ids.extend(members.iter().map(|member| member.product.id.clone()));

        let score =
            members.iter().map(|member| member.match_score).sum::<f64>() / members.len() as f64;

        let id = format!("outfit_{:x}", md5::compute(item_ids.join("+")));
        outfits.push(Outfit {
            id: id[..14.min(id.len())].to_string(),
            name: format!("{} look {}", title_word(occasion), variation + 1),
            occasion: occasion.to_string(),
            item_ids,
            score,
            match_reasons: vec![
                format!("Completes your pieces for {occasion}"),
                "Fills the missing categories around what you picked".to_string(),
            ],
        });
    }

    outfits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    outfits
}

fn title_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
