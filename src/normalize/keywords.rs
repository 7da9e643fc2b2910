//! Deterministic keyword-table heuristics for attribute inference.
//!
//! Sources rarely expose structured color/style/fit data, so the tables
//! here recover those attributes from product names and descriptions. All
//! inference is a fixed-table scan: same input, same output.

use crate::registry::SourceConfig;

const COLOR_KEYWORDS: &[&str] = &[
    "black", "white", "ivory", "cream", "beige", "tan", "camel", "brown", "khaki", "olive",
    "green", "navy", "blue", "teal", "red", "burgundy", "pink", "purple", "yellow", "mustard",
    "orange", "grey", "gray", "charcoal", "silver", "gold",
];

const STYLE_KEYWORDS: &[&str] = &[
    "casual", "formal", "classic", "minimalist", "trendy", "edgy", "sporty", "bohemian",
    "vintage", "streetwear", "elegant", "preppy", "relaxed", "tailored",
];

const OCCASION_KEYWORDS: &[&str] = &[
    "casual", "business", "work", "office", "formal", "party", "evening", "date night",
    "weekend", "wedding", "vacation", "athletic", "winter", "summer",
];

const FIT_KEYWORDS: &[&str] = &[
    "slim", "skinny", "fitted", "regular", "relaxed", "loose", "oversized", "straight", "wide",
    "cropped", "tailored",
];

const SUBCATEGORIES: &[(&str, &[&str])] = &[
    (
        "tops",
        &[
            "t-shirt", "tee", "blouse", "sweater", "hoodie", "cardigan", "polo", "tank", "shirt",
        ],
    ),
    (
        "bottoms",
        &[
            "jeans", "chinos", "trousers", "shorts", "skirt", "leggings", "joggers", "pants",
        ],
    ),
    (
        "dresses",
        &["maxi", "midi", "mini", "wrap", "slip", "shirt dress", "sundress"],
    ),
    (
        "outerwear",
        &["parka", "trench", "puffer", "bomber", "blazer", "jacket", "coat"],
    ),
    (
        "shoes",
        &["sneaker", "boot", "loafer", "heel", "sandal", "flat", "oxford", "trainer"],
    ),
    (
        "accessories",
        &["bag", "belt", "scarf", "hat", "beanie", "watch", "sunglasses", "jewelry"],
    ),
];

/// Style tags a category implies when the name itself says nothing.
const CATEGORY_STYLE_FILLERS: &[(&str, &[&str])] = &[
    ("tops", &["casual", "versatile"]),
    ("bottoms", &["casual", "classic"]),
    ("dresses", &["elegant", "feminine"]),
    ("outerwear", &["classic", "layered"]),
    ("shoes", &["casual", "versatile"]),
    ("accessories", &["versatile", "classic"]),
];

const CATEGORY_OCCASION_FILLERS: &[(&str, &[&str])] = &[
    ("tops", &["casual", "work"]),
    ("bottoms", &["casual", "work"]),
    ("dresses", &["date night", "evening"]),
    ("outerwear", &["casual", "winter"]),
    ("shoes", &["casual"]),
    ("accessories", &["casual"]),
];

/// Generic URL keyword -> canonical category, checked in order.
const URL_CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("t-shirt", "tops"),
    ("shirt", "tops"),
    ("top", "tops"),
    ("knitwear", "tops"),
    ("sweater", "tops"),
    ("trouser", "bottoms"),
    ("pant", "bottoms"),
    ("denim", "bottoms"),
    ("jean", "bottoms"),
    ("skirt", "bottoms"),
    ("bottom", "bottoms"),
    ("dress", "dresses"),
    ("gown", "dresses"),
    ("jacket", "outerwear"),
    ("coat", "outerwear"),
    ("outerwear", "outerwear"),
    ("sneaker", "shoes"),
    ("footwear", "shoes"),
    ("shoe", "shoes"),
    ("boot", "shoes"),
    ("accessor", "accessories"),
    ("bag", "accessories"),
    ("jewel", "accessories"),
];

/// First color keyword found in the name; `"black"` when none match.
pub fn infer_color(name: &str) -> String {
    let name = name.to_lowercase();
    COLOR_KEYWORDS
        .iter()
        .find(|color| name.contains(*color))
        .map(|color| if *color == "gray" { "grey" } else { *color })
        .unwrap_or("black")
        .to_string()
}

/// First category-scoped subcategory keyword found in the name.
pub fn infer_subcategory(category: &str, name: &str) -> Option<String> {
    let name = name.to_lowercase();
    let category = category.to_lowercase();
    SUBCATEGORIES
        .iter()
        .find(|(cat, _)| *cat == category)
        .and_then(|(_, keywords)| keywords.iter().find(|kw| name.contains(*kw)))
        .map(|kw| kw.to_string())
}

/// Union of style keywords found in the text, topped up with category
/// fillers until at least two tags are present.
pub fn infer_style_tags(category: &str, text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    let mut tags: Vec<String> = STYLE_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();

    if tags.len() < 2 {
        let category = category.to_lowercase();
        let fillers = CATEGORY_STYLE_FILLERS
            .iter()
            .find(|(cat, _)| *cat == category)
            .map(|(_, fillers)| *fillers)
            .unwrap_or(&["casual", "versatile"]);
        for filler in fillers {
            if !tags.iter().any(|t| t == filler) {
                tags.push(filler.to_string());
            }
            if tags.len() >= 2 {
                break;
            }
        }
    }
    tags
}

/// Union of occasion keywords found in the text, with a category filler
/// when nothing matched.
pub fn infer_occasions(category: &str, text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    let mut occasions: Vec<String> = OCCASION_KEYWORDS
        .iter()
        .filter(|kw| text.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();

    if occasions.is_empty() {
        let category = category.to_lowercase();
        let fillers = CATEGORY_OCCASION_FILLERS
            .iter()
            .find(|(cat, _)| *cat == category)
            .map(|(_, fillers)| *fillers)
            .unwrap_or(&["casual"]);
        occasions.extend(fillers.iter().map(|f| f.to_string()));
    }
    occasions
}

/// First fit keyword in the name; `"regular"` when none match.
pub fn infer_fit(name: &str) -> String {
    let name = name.to_lowercase();
    FIT_KEYWORDS
        .iter()
        .find(|kw| name.contains(*kw))
        .unwrap_or(&"regular")
        .to_string()
}

/// Map loose source vocabulary ("Shirts & Tops", "product-category/denim")
/// onto the canonical category set.
pub fn canonical_category(text: &str) -> Option<String> {
    let text = text.to_lowercase();
    URL_CATEGORY_KEYWORDS
        .iter()
        .find(|(kw, _)| text.contains(kw))
        .map(|(_, category)| category.to_string())
}

/// Infer the category a listing URL is showing: the retailer's own category
/// table first, then the generic keyword scan, then an opaque bucket.
pub fn category_from_url(config: &SourceConfig, url: &str) -> String {
    let url = url.to_lowercase();
    for (category, segment) in &config.category_paths {
        if url.contains(&segment.to_lowercase()) {
            return category.clone();
        }
    }
    canonical_category(&url).unwrap_or_else(|| "clothing".to_string())
}

/// Parse a price out of arbitrary display text. Currency symbols are
/// stripped and the decimal separator is positional: the last `.` or `,`
/// followed by exactly two digits is the decimal point, everything else is
/// grouping. Malformed text yields 0, never an error.
pub fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let bytes = cleaned.as_bytes();
    let mut decimal_pos = None;
    for (i, b) in bytes.iter().enumerate().rev() {
        if *b == b'.' || *b == b',' {
            if bytes.len() - i - 1 == 2 {
                decimal_pos = Some(i);
            }
            // Only the last separator can be the decimal point
            break;
        }
    }

    let (int_part, frac_part) = match decimal_pos {
        Some(i) => (&cleaned[..i], &cleaned[i + 1..]),
        None => (cleaned.as_str(), ""),
    };

    let digits: String = int_part.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() && frac_part.is_empty() {
        return 0.0;
    }
    let joined = format!(
        "{}.{}",
        if digits.is_empty() { "0" } else { &digits },
        if frac_part.is_empty() { "0" } else { frac_part }
    );
    joined.parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;

    #[test]
    fn price_parsing_handles_grouping_and_decimals() {
        assert_eq!(parse_price("$1,234.56"), 1234.56);
        assert_eq!(parse_price("1.234,56 €"), 1234.56);
        assert_eq!(parse_price("£45"), 45.0);
        assert_eq!(parse_price("1,299"), 1299.0);
        assert_eq!(parse_price("  $ 89.90 "), 89.9);
    }

    #[test]
    fn malformed_price_text_yields_zero() {
        assert_eq!(parse_price("garbled"), 0.0);
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("price on request"), 0.0);
    }

    #[test]
    fn color_defaults_to_black() {
        assert_eq!(infer_color("Navy Wool Overshirt"), "navy");
        assert_eq!(infer_color("Wool Overshirt"), "black");
        assert_eq!(infer_color("Heather Gray Hoodie"), "grey");
    }

    #[test]
    fn subcategory_is_category_scoped() {
        assert_eq!(
            infer_subcategory("tops", "Organic Cotton Tee"),
            Some("tee".to_string())
        );
        // "jeans" is a bottoms keyword, not a tops keyword
        assert_eq!(infer_subcategory("tops", "Slim Jeans"), None);
    }

    #[test]
    fn style_tags_are_topped_up_to_two() {
        let tags = infer_style_tags("dresses", "Plain Midi");
        assert!(tags.len() >= 2);
        assert!(tags.contains(&"elegant".to_string()));

        let found = infer_style_tags("tops", "Vintage Sporty Jersey");
        assert!(found.contains(&"vintage".to_string()));
        assert!(found.contains(&"sporty".to_string()));
    }

    #[test]
    fn occasions_fall_back_per_category() {
        assert_eq!(
            infer_occasions("dresses", "Silk Slip"),
            vec!["date night".to_string(), "evening".to_string()]
        );
        let tagged = infer_occasions("tops", "Business Oxford Shirt");
        assert!(tagged.contains(&"business".to_string()));
    }

    #[test]
    fn fit_defaults_to_regular() {
        assert_eq!(infer_fit("Oversized Flannel"), "oversized");
        assert_eq!(infer_fit("Flannel Shirt"), "regular");
    }

    #[test]
    fn category_from_url_prefers_retailer_table() {
        let registry = SourceRegistry::with_defaults();
        let config = registry.resolve("nordic-thread");
        assert_eq!(
            category_from_url(config, "https://www.nordicthread.com/collections/jackets-coats?page=2"),
            "outerwear"
        );
        assert_eq!(
            category_from_url(config, "https://www.nordicthread.com/collections/denim-shop"),
            "bottoms"
        );
        assert_eq!(
            category_from_url(config, "https://www.nordicthread.com/collections/misc"),
            "clothing"
        );
    }
}
