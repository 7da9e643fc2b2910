//! Platform API payload mapping.
//!
//! Each platform returns its own response shape; this module maps the known
//! shapes onto the canonical product model, filling gaps with the same
//! keyword tables the HTML path uses. Items that cannot produce an id and a
//! name are skipped, never fatal.

use serde_json::Value;
use tracing::debug;

use crate::models::Product;
use crate::registry::{Platform, SourceConfig};

use super::keywords;

const SIZE_TOKENS: &[&str] = &["xxs", "xs", "s", "m", "l", "xl", "xxl", "xxxl"];

/// Map one platform response page onto products.
pub fn parse_platform_payload(
    config: &SourceConfig,
    platform: Platform,
    payload: &Value,
    category: Option<&str>,
) -> Vec<Product> {
    let products = match platform {
        Platform::Shopify => parse_shopify(config, payload, category),
        Platform::WooCommerce => parse_woocommerce(config, payload, category),
        Platform::GenericRest => parse_generic(config, payload, category),
    };
    debug!(
        retailer = %config.retailer_id,
        count = products.len(),
        "mapped platform payload"
    );
    products
}

fn parse_shopify(config: &SourceConfig, payload: &Value, category: Option<&str>) -> Vec<Product> {
    let Some(items) = payload.get("products").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut products = Vec::new();
    for item in items {
        let Some(native_id) = value_to_id(item.get("id")) else {
            continue;
        };
        let Some(name) = item.get("title").and_then(Value::as_str) else {
            continue;
        };

        let vendor = item
            .get("vendor")
            .and_then(Value::as_str)
            .map(str::to_string);
        let product_type = item
            .get("product_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let tags = string_list(item.get("tags"));
        let description = item
            .get("body_html")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let url = item
            .get("handle")
            .and_then(Value::as_str)
            .map(|handle| format!("{}/products/{handle}", config.base_url.trim_end_matches('/')))
            .unwrap_or_default();

        let image_urls: Vec<String> = item
            .get("images")
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .filter_map(|img| img.get("src").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        // Variant option values carry sizes and colors interchangeably
        let mut sizes = Vec::new();
        let mut colors = Vec::new();
        let mut current_price = 0.0;
        let mut compare_at = 0.0;
        let mut any_available = false;
        let mut saw_availability = false;

        if let Some(variants) = item.get("variants").and_then(Value::as_array) {
            for variant in variants {
                if current_price <= 0.0 {
                    current_price = as_price(variant.get("price"));
                }
                if compare_at <= 0.0 {
                    compare_at = as_price(variant.get("compare_at_price"));
                }
                if let Some(available) = variant.get("available").and_then(Value::as_bool) {
                    saw_availability = true;
                    any_available |= available;
                }
                for option_key in ["option1", "option2"] {
                    if let Some(option) = variant.get(option_key).and_then(Value::as_str) {
                        let lower = option.to_lowercase();
                        if SIZE_TOKENS.contains(&lower.as_str())
                            || lower.parse::<u32>().is_ok()
                        {
                            push_unique(&mut sizes, option.to_string());
                        } else {
                            push_unique(&mut colors, lower);
                        }
                    }
                }
            }
        }

        // compare_at_price is the pre-markdown price when a sale is on
        let (price, sale_price) = if compare_at > current_price && current_price > 0.0 {
            (compare_at, Some(current_price))
        } else {
            (current_price, None)
        };

        let category = category
            .map(str::to_string)
            .or_else(|| keywords::canonical_category(product_type))
            .unwrap_or_else(|| "clothing".to_string());

        let mut product = assemble(
            config,
            &category,
            &native_id,
            name,
            vendor,
            price,
            sale_price,
            url,
            image_urls,
            sizes,
            if saw_availability { any_available } else { true },
            description,
            &tags,
        );
        product.colors = if colors.is_empty() {
            vec![keywords::infer_color(name)]
        } else {
            colors
        };
        product.apply_fallbacks();
        products.push(product);
    }
    products
}

fn parse_woocommerce(
    config: &SourceConfig,
    payload: &Value,
    category: Option<&str>,
) -> Vec<Product> {
    // WooCommerce returns a bare array of products
    let Some(items) = payload
        .as_array()
        .or_else(|| payload.get("products").and_then(Value::as_array))
    else {
        return Vec::new();
    };

    let mut products = Vec::new();
    for item in items {
        let Some(native_id) = value_to_id(item.get("id")) else {
            continue;
        };
        let Some(name) = item.get("name").and_then(Value::as_str) else {
            continue;
        };

        let description = item
            .get("short_description")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .or_else(|| item.get("description").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string();

        let url = item
            .get("permalink")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let image_urls: Vec<String> = item
            .get("images")
            .and_then(Value::as_array)
            .map(|images| {
                images
                    .iter()
                    .filter_map(|img| img.get("src").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let regular = as_price(item.get("regular_price"));
        let active = as_price(item.get("price"));
        let on_sale = item
            .get("on_sale")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let (price, sale_price) = if on_sale {
            let sale = as_price(item.get("sale_price"));
            let price = if regular > 0.0 { regular } else { active };
            (price, Some(if sale > 0.0 { sale } else { active }))
        } else {
            (if regular > 0.0 { regular } else { active }, None)
        };

        let mut sizes = Vec::new();
        let mut colors = Vec::new();
        let mut brand = None;
        let mut fit = None;
        if let Some(attributes) = item.get("attributes").and_then(Value::as_array) {
            for attribute in attributes {
                let attr_name = attribute
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_lowercase();
                let options = string_list(attribute.get("options"));
                match attr_name.as_str() {
                    "size" | "sizes" => sizes.extend(options),
                    "color" | "colour" | "colors" | "colours" => {
                        colors.extend(options.iter().map(|c| c.to_lowercase()))
                    }
                    "brand" => brand = options.into_iter().next(),
                    "fit" => fit = options.into_iter().next().map(|f| f.to_lowercase()),
                    _ => {}
                }
            }
        }

        let tags: Vec<String> = item
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .map(|t| t.to_lowercase())
                    .collect()
            })
            .unwrap_or_default();

        let category = category
            .map(str::to_string)
            .or_else(|| {
                item.get("categories")
                    .and_then(Value::as_array)
                    .and_then(|categories| {
                        categories.iter().find_map(|c| {
                            c.get("name")
                                .and_then(Value::as_str)
                                .and_then(keywords::canonical_category)
                        })
                    })
            })
            .unwrap_or_else(|| "clothing".to_string());

        let in_stock = item
            .get("stock_status")
            .and_then(Value::as_str)
            .map(|status| status == "instock")
            .unwrap_or(true);

        let mut product = assemble(
            config,
            &category,
            &native_id,
            name,
            brand,
            price,
            sale_price,
            url,
            image_urls,
            sizes,
            in_stock,
            description,
            &tags,
        );
        if !colors.is_empty() {
            product.colors = colors;
        }
        if let Some(fit) = fit {
            product.fit = fit;
        }
        product.apply_fallbacks();
        products.push(product);
    }
    products
}

fn parse_generic(config: &SourceConfig, payload: &Value, category: Option<&str>) -> Vec<Product> {
    // Different APIs wrap the list differently
    let items = ["products", "items", "data"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_array))
        .or_else(|| payload.as_array());
    let Some(items) = items else {
        return Vec::new();
    };

    let mut products = Vec::new();
    for item in items {
        let native_id = ["id", "product_id", "sku", "item_id"]
            .iter()
            .find_map(|key| value_to_id(item.get(*key)));
        let Some(native_id) = native_id else {
            continue;
        };
        let name = ["name", "title"]
            .iter()
            .find_map(|key| item.get(*key).and_then(Value::as_str));
        let Some(name) = name else {
            continue;
        };

        let price = as_price(item.get("price"));
        let sale_price = Some(as_price(item.get("sale_price"))).filter(|sale| *sale > 0.0);

        let category = category
            .map(str::to_string)
            .or_else(|| {
                item.get("category")
                    .and_then(Value::as_str)
                    .and_then(keywords::canonical_category)
            })
            .unwrap_or_else(|| "clothing".to_string());

        let image_urls = item
            .get("images")
            .map(|images| string_list(Some(images)))
            .filter(|images| !images.is_empty())
            .or_else(|| {
                item.get("image")
                    .and_then(Value::as_str)
                    .map(|src| vec![src.to_string()])
            })
            .unwrap_or_default();

        let tags = string_list(item.get("tags"));

        let mut product = assemble(
            config,
            &category,
            &native_id,
            name,
            item.get("brand").and_then(Value::as_str).map(str::to_string),
            price,
            sale_price,
            item.get("url")
                .or_else(|| item.get("link"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            image_urls,
            string_list(item.get("sizes")),
            item.get("in_stock").and_then(Value::as_bool).unwrap_or(true),
            item.get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            &tags,
        );

        let colors: Vec<String> = string_list(item.get("colors"))
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect();
        if !colors.is_empty() {
            product.colors = colors;
        }
        if let Some(trending) = item.get("trending_score").and_then(Value::as_f64) {
            product.trending_score = trending;
        }
        product.apply_fallbacks();
        products.push(product);
    }
    products
}

/// Shared assembly: structured fields where the platform supplied them,
/// keyword inference over name/description/tags for the rest.
#[allow(clippy::too_many_arguments)]
fn assemble(
    config: &SourceConfig,
    category: &str,
    native_id: &str,
    name: &str,
    brand: Option<String>,
    price: f64,
    sale_price: Option<f64>,
    url: String,
    image_urls: Vec<String>,
    sizes: Vec<String>,
    in_stock: bool,
    description: String,
    tags: &[String],
) -> Product {
    let haystack = format!("{name} {description} {}", tags.join(" "));
    Product {
        id: format!("{}_{native_id}", config.retailer_id),
        name: name.to_string(),
        brand: brand.unwrap_or_else(|| config.retailer_name.clone()),
        category: category.to_string(),
        subcategory: keywords::infer_subcategory(category, name),
        colors: vec![keywords::infer_color(name)],
        style_tags: keywords::infer_style_tags(category, &haystack),
        occasions: keywords::infer_occasions(category, &haystack),
        fit: keywords::infer_fit(&haystack),
        price,
        sale_price,
        retailer_id: config.retailer_id.clone(),
        image_urls,
        url,
        sizes,
        in_stock,
        trending_score: 0.5,
        description,
    }
}

fn value_to_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accept prices as JSON numbers or display strings.
fn as_price(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => keywords::parse_price(s),
        _ => 0.0,
    }
}

/// Accept `["a", "b"]`, `"a, b"` or a single string.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.is_empty() => {
            s.split(',').map(|part| part.trim().to_string()).collect()
        }
        _ => Vec::new(),
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.iter().any(|existing| *existing == value) {
        list.push(value);
    }
}
