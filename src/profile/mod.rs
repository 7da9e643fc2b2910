//! User style profile construction.
//!
//! A profile is built once per request from whatever the caller supplied:
//! a ready-made profile, quiz answers plus closet contents, or nothing at
//! all (the neutral default). Quiz selections carry more weight than closet
//! frequencies; favorites in the closet count half again as much.

use std::collections::HashMap;

use tracing::debug;

use crate::error::StylistError;
use crate::models::{ClosetItem, QuizAnswers, RecommendationRequest, UserStyleProfile};

const QUIZ_WEIGHT: f64 = 0.5;
const CLOSET_WEIGHT: f64 = 0.3;
const FAVORITE_MULTIPLIER: f64 = 1.5;

/// Hardcoded fallback: casual/versatile tastes, neutral colors.
pub fn default_profile() -> UserStyleProfile {
    UserStyleProfile {
        user_id: "anonymous".to_string(),
        style_weights: weights(&[
            ("casual", 0.8),
            ("versatile", 0.7),
            ("classic", 0.6),
            ("minimalist", 0.5),
        ]),
        preferred_styles: vec!["casual".to_string(), "versatile".to_string()],
        color_weights: weights(&[
            ("black", 0.8),
            ("white", 0.7),
            ("navy", 0.6),
            ("grey", 0.6),
            ("beige", 0.5),
        ]),
        fit_weights: weights(&[("regular", 0.7), ("relaxed", 0.5)]),
        brand_weights: HashMap::new(),
        preferred_categories: vec![
            "tops".to_string(),
            "bottoms".to_string(),
            "shoes".to_string(),
            "outerwear".to_string(),
        ],
        preferred_occasions: vec!["casual".to_string(), "work".to_string()],
        avoided_styles: Vec::new(),
        avoided_colors: Vec::new(),
    }
}

/// Build a profile from quiz answers and closet contents.
pub fn build_profile(
    user_id: &str,
    quiz: Option<&QuizAnswers>,
    closet: &[ClosetItem],
) -> UserStyleProfile {
    let mut profile = UserStyleProfile {
        user_id: if user_id.is_empty() {
            "anonymous".to_string()
        } else {
            user_id.to_string()
        },
        ..Default::default()
    };

    if let Some(quiz) = quiz {
        for style in &quiz.overall_styles {
            let style = style.to_lowercase();
            bump(&mut profile.style_weights, &style, QUIZ_WEIGHT);
            profile.preferred_styles.push(style);
        }
        for color in &quiz.color_palettes {
            bump(&mut profile.color_weights, &color.to_lowercase(), QUIZ_WEIGHT);
        }
        for fit in &quiz.fits {
            bump(&mut profile.fit_weights, &fit.to_lowercase(), QUIZ_WEIGHT);
        }
        for brand in &quiz.favorite_brands {
            bump(&mut profile.brand_weights, &brand.to_lowercase(), QUIZ_WEIGHT);
        }
        profile.preferred_occasions = quiz.occasions.iter().map(|o| o.to_lowercase()).collect();
        profile
            .avoided_styles
            .extend(quiz.avoided_styles.iter().map(|s| s.to_lowercase()));
        profile
            .avoided_colors
            .extend(quiz.avoided_colors.iter().map(|c| c.to_lowercase()));
    }

    if !closet.is_empty() {
        let total = closet.len() as f64;
        let mut category_counts: HashMap<String, usize> = HashMap::new();

        for item in closet {
            let per_item = CLOSET_WEIGHT / total
                * if item.favorite {
                    FAVORITE_MULTIPLIER
                } else {
                    1.0
                };

            *category_counts
                .entry(item.category.to_lowercase())
                .or_default() += 1;

            if let Some(color) = &item.color {
                bump(&mut profile.color_weights, &color.to_lowercase(), per_item);
            }
            if let Some(brand) = &item.brand {
                bump(&mut profile.brand_weights, &brand.to_lowercase(), per_item);
            }
            for tag in &item.tags {
                bump(&mut profile.style_weights, &tag.to_lowercase(), per_item);
            }
        }

        // What the user owns most of leads the category order
        let mut categories: Vec<(String, usize)> = category_counts.into_iter().collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        profile.preferred_categories = categories.into_iter().map(|(cat, _)| cat).collect();
    }

    debug!(
        user_id = %profile.user_id,
        styles = profile.style_weights.len(),
        colors = profile.color_weights.len(),
        "built style profile"
    );
    profile
}

/// Resolve the profile a request should be scored against.
pub fn resolve(request: &RecommendationRequest) -> Result<UserStyleProfile, StylistError> {
    let profile = if let Some(profile) = &request.profile {
        profile.clone()
    } else if request.quiz.is_some() || !request.closet.is_empty() {
        build_profile("anonymous", request.quiz.as_ref(), &request.closet)
    } else {
        default_profile()
    };
    validate(&profile)?;
    Ok(profile)
}

/// Malformed weights are the caller's problem, not something to degrade
/// around.
pub fn validate(profile: &UserStyleProfile) -> Result<(), StylistError> {
    let tables = [
        ("style", &profile.style_weights),
        ("color", &profile.color_weights),
        ("fit", &profile.fit_weights),
        ("brand", &profile.brand_weights),
    ];
    for (kind, table) in tables {
        for (key, weight) in table {
            if !(0.0..=1.0).contains(weight) || !weight.is_finite() {
                return Err(StylistError::Validation(format!(
                    "{kind} weight for `{key}` must be within [0, 1], got {weight}"
                )));
            }
        }
    }
    Ok(())
}

fn weights(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries
        .iter()
        .map(|(key, weight)| (key.to_string(), *weight))
        .collect()
}

fn bump(table: &mut HashMap<String, f64>, key: &str, amount: f64) {
    let entry = table.entry(key.to_string()).or_insert(0.0);
    *entry = (*entry + amount).min(1.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz() -> QuizAnswers {
        QuizAnswers {
            overall_styles: vec!["Minimalist".to_string(), "Classic".to_string()],
            color_palettes: vec!["Navy".to_string(), "Grey".to_string()],
            fits: vec!["Relaxed".to_string()],
            occasions: vec!["Business".to_string()],
            favorite_brands: vec!["Fjell".to_string()],
            avoided_styles: vec!["Neon".to_string()],
            avoided_colors: vec!["Orange".to_string()],
        }
    }

    #[test]
    fn quiz_answers_become_weighted_preferences() {
        let profile = build_profile("u1", Some(&quiz()), &[]);

        assert_eq!(profile.style_weights.get("minimalist"), Some(&QUIZ_WEIGHT));
        assert_eq!(profile.color_weights.get("navy"), Some(&QUIZ_WEIGHT));
        assert_eq!(profile.fit_weights.get("relaxed"), Some(&QUIZ_WEIGHT));
        assert_eq!(profile.brand_weights.get("fjell"), Some(&QUIZ_WEIGHT));
        assert_eq!(profile.preferred_occasions, vec!["business"]);
        assert_eq!(profile.avoided_styles, vec!["neon"]);
        assert_eq!(profile.avoided_colors, vec!["orange"]);
    }

    #[test]
    fn closet_frequencies_weight_less_than_quiz_picks() {
        let closet = vec![
            ClosetItem {
                category: "tops".to_string(),
                color: Some("Black".to_string()),
                brand: Some("Fjell".to_string()),
                tags: vec!["casual".to_string()],
                favorite: false,
            },
            ClosetItem {
                category: "tops".to_string(),
                color: Some("Black".to_string()),
                brand: None,
                tags: vec![],
                favorite: true,
            },
            ClosetItem {
                category: "shoes".to_string(),
                color: Some("White".to_string()),
                brand: None,
                tags: vec![],
                favorite: false,
            },
        ];

        let profile = build_profile("u2", None, &closet);

        // black: 0.1 (regular) + 0.15 (favorite) = 0.25
        let black = profile.color_weights.get("black").copied().unwrap_or(0.0);
        assert!((black - 0.25).abs() < 1e-9);
        assert!(black < QUIZ_WEIGHT);
        // tops owned twice, shoes once
        assert_eq!(profile.preferred_categories[0], "tops");
    }

    #[test]
    fn weight_cap_is_one() {
        let closet: Vec<ClosetItem> = (0..4)
            .map(|_| ClosetItem {
                category: "tops".to_string(),
                color: Some("black".to_string()),
                brand: None,
                tags: vec!["minimalist".to_string()],
                favorite: true,
            })
            .collect();
        let profile = build_profile("u3", Some(&quiz()), &closet);
        for weight in profile.style_weights.values() {
            assert!(*weight <= 1.0);
        }
    }

    #[test]
    fn out_of_range_weights_are_rejected() {
        let mut profile = default_profile();
        profile.style_weights.insert("casual".to_string(), 1.4);
        assert!(matches!(
            validate(&profile),
            Err(StylistError::Validation(_))
        ));
    }

    #[test]
    fn empty_request_resolves_to_default_profile() {
        let request = RecommendationRequest::default();
        let profile = resolve(&request).unwrap();
        assert_eq!(profile.user_id, "anonymous");
        assert!(profile.style_weights.contains_key("casual"));
    }
}
