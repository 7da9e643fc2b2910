//! Normalization: raw API payloads and scraped markup become canonical
//! [`Product`](crate::models::Product) values.
//!
//! There is exactly one parsing pipeline; the retailer-specific, generic
//! and heuristic extraction tiers are successive passes inside it.

mod api;
mod html;
pub mod keywords;

pub use api::parse_platform_payload;
pub use html::{ParsedPage, parse_listing};

use crate::models::Product;
use crate::registry::SourceConfig;

/// Assemble a product from the fields a source managed to supply, filling
/// the remaining attributes from the keyword tables and enforcing the
/// model invariants.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_product(
    config: &SourceConfig,
    category: &str,
    native_id: Option<&str>,
    name: String,
    brand: Option<String>,
    price: f64,
    sale_price: Option<f64>,
    url: String,
    image_urls: Vec<String>,
    sizes: Vec<String>,
    in_stock: bool,
    description: String,
) -> Product {
    let id = match native_id {
        Some(native) => format!("{}_{}", config.retailer_id, native),
        // Scraped items carry no native id; hash the namespaced URL instead
        None => format!(
            "{}_{:x}",
            config.retailer_id,
            md5::compute(format!("{}:{}", config.retailer_id, url))
        ),
    };

    let haystack = format!("{name} {description}");
    let mut product = Product {
        id,
        brand: brand.unwrap_or_else(|| config.retailer_name.clone()),
        category: category.to_string(),
        subcategory: keywords::infer_subcategory(category, &name),
        colors: vec![keywords::infer_color(&name)],
        style_tags: keywords::infer_style_tags(category, &haystack),
        occasions: keywords::infer_occasions(category, &haystack),
        fit: keywords::infer_fit(&name),
        price,
        sale_price,
        retailer_id: config.retailer_id.clone(),
        image_urls,
        url,
        sizes,
        in_stock,
        trending_score: 0.5,
        description,
        name,
    };
    product.apply_fallbacks();
    product
}
