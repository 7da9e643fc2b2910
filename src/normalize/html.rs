//! HTML listing extraction.
//!
//! Three tiers over the same document: the retailer's selector table, the
//! generic selector set, then a broad heuristic (any link wrapping an image
//! with a price-like or name-like descendant). A tier failure falls through
//! to the next; only all three coming up empty is a parse failure.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::error::StylistError;
use crate::models::Product;
use crate::registry::{SiteSelectors, SourceConfig};

use super::{build_product, keywords};

/// One parsed listing page.
pub struct ParsedPage {
    pub products: Vec<Product>,
    /// Highest page number advertised by the pagination widget, if any
    pub total_pages: Option<u32>,
}

fn price_like() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\$\u{a3}\u{20ac}\u{a5}]\s*[\d,]+(?:\.\d+)?|\d+[.,]\d{2}").unwrap()
    })
}

/// Parse one listing page into products.
///
/// `category` is the caller's requested category when known; otherwise it
/// is inferred from the listing URL.
pub fn parse_listing(
    config: &SourceConfig,
    html: &str,
    listing_url: &str,
    category: Option<&str>,
) -> Result<ParsedPage, StylistError> {
    let document = Html::parse_document(html);
    let category = category
        .map(str::to_string)
        .unwrap_or_else(|| keywords::category_from_url(config, listing_url));

    let mut products = match extract_with_selectors(config, &config.selectors, &document, &category)
    {
        Ok(products) => products,
        Err(e) => {
            warn!(retailer = %config.retailer_id, error = %e, "retailer selector table unusable");
            Vec::new()
        }
    };

    if products.is_empty() {
        debug!(retailer = %config.retailer_id, "retailer selectors matched nothing, trying generic set");
        products = match extract_with_selectors(config, &SiteSelectors::generic(), &document, &category) {
            Ok(products) => products,
            Err(e) => {
                warn!(retailer = %config.retailer_id, error = %e, "generic selector table unusable");
                Vec::new()
            }
        };
    }

    if products.is_empty() {
        debug!(retailer = %config.retailer_id, "generic selectors matched nothing, trying broad heuristic");
        products = extract_heuristic(config, &document, &category);
    }

    if products.is_empty() {
        return Err(StylistError::parse(format!(
            "listing page for {} ({listing_url})",
            config.retailer_id
        )));
    }

    Ok(ParsedPage {
        products,
        total_pages: extract_total_pages(&document),
    })
}

fn parse_selector(css: &str) -> Result<Selector, StylistError> {
    Selector::parse(css).map_err(|e| StylistError::parse(format!("selector `{css}`: {e:?}")))
}

fn extract_with_selectors(
    config: &SourceConfig,
    selectors: &SiteSelectors,
    document: &Html,
    category: &str,
) -> Result<Vec<Product>, StylistError> {
    let container_sel = parse_selector(&selectors.product_container)?;
    let name_sel = parse_selector(&selectors.name)?;
    let price_sel = parse_selector(&selectors.price)?;
    let link_sel = parse_selector(&selectors.link)?;
    let image_sel = parse_selector(&selectors.image)?;
    let sale_sel = selectors
        .sale_price
        .as_deref()
        .map(parse_selector)
        .transpose()?;
    let brand_sel = selectors.brand.as_deref().map(parse_selector).transpose()?;
    let sold_out_sel = selectors
        .sold_out
        .as_deref()
        .map(parse_selector)
        .transpose()?;

    let mut products = Vec::new();
    let mut seen_urls = HashSet::new();

    for container in document.select(&container_sel) {
        let Some(href) = container
            .select(&link_sel)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            continue;
        };

        let mut url = absolutize(&config.base_url, href);
        // Tracking parameters make the same product look unique
        if let Some(query_start) = url.find('?') {
            url.truncate(query_start);
        }
        if !seen_urls.insert(url.clone()) {
            continue;
        }

        let Some(name) = container
            .select(&name_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty())
        else {
            continue;
        };

        let price_text = container
            .select(&price_sel)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();
        let price = keywords::parse_price(&price_text);

        let sale_price = sale_sel
            .as_ref()
            .and_then(|sel| container.select(sel).next())
            .map(|el| keywords::parse_price(&el.text().collect::<String>()))
            .filter(|sale| *sale > 0.0);

        let brand = brand_sel
            .as_ref()
            .and_then(|sel| container.select(sel).next())
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|brand| !brand.is_empty());

        let in_stock = match &sold_out_sel {
            Some(sel) => !container.select(sel).any(|el| {
                let text = el.text().collect::<String>().to_lowercase();
                text.contains("sold out") || text.contains("out of stock")
            }),
            None => true,
        };

        let image_urls = container
            .select(&image_sel)
            .next()
            .and_then(|img| {
                // data-src first for lazy-loaded images, then src
                img.value()
                    .attr("data-src")
                    .or_else(|| img.value().attr("src"))
            })
            .map(|src| vec![normalize_image_url(&config.base_url, src)])
            .unwrap_or_default();

        products.push(build_product(
            config,
            category,
            None,
            name,
            brand,
            price,
            sale_price,
            url,
            image_urls,
            Vec::new(),
            in_stock,
            String::new(),
        ));
    }

    Ok(products)
}

/// Last-resort extraction: any anchor wrapping an image whose text carries
/// a price-like token or a name-like run of words.
fn extract_heuristic(config: &SourceConfig, document: &Html, category: &str) -> Vec<Product> {
    static ANCHOR: OnceLock<Selector> = OnceLock::new();
    static IMG: OnceLock<Selector> = OnceLock::new();
    let anchor_sel = ANCHOR.get_or_init(|| Selector::parse("a[href]").unwrap());
    let img_sel = IMG.get_or_init(|| Selector::parse("img").unwrap());

    let mut products = Vec::new();
    let mut seen_urls = HashSet::new();

    for anchor in document.select(anchor_sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(img) = anchor.select(img_sel).next() else {
            continue;
        };

        let text = anchor.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

        let price = price_like()
            .find(&text)
            .map(|m| keywords::parse_price(m.as_str()));

        let alt = img.value().attr("alt").unwrap_or("").trim().to_string();
        let name = if alt.len() >= 8 {
            alt
        } else {
            price_like().replace_all(&text, "").trim().to_string()
        };

        // Needs at least one of the two signals to count as a product tile
        if price.is_none() && name.len() < 8 {
            continue;
        }
        if name.is_empty() {
            continue;
        }

        let mut url = absolutize(&config.base_url, href);
        if let Some(query_start) = url.find('?') {
            url.truncate(query_start);
        }
        if !seen_urls.insert(url.clone()) {
            continue;
        }

        let image_urls = img
            .value()
            .attr("data-src")
            .or_else(|| img.value().attr("src"))
            .map(|src| vec![normalize_image_url(&config.base_url, src)])
            .unwrap_or_default();

        products.push(build_product(
            config,
            category,
            None,
            name,
            None,
            price.unwrap_or(0.0),
            None,
            url,
            image_urls,
            Vec::new(),
            true,
            String::new(),
        ));
    }

    products
}

/// Highest page number advertised in a pagination widget.
fn extract_total_pages(document: &Html) -> Option<u32> {
    static PAGINATION: OnceLock<Selector> = OnceLock::new();
    let sel = PAGINATION.get_or_init(|| {
        Selector::parse(
            ".pagination a, nav[class*='pagination'] a, ul[class*='pagination'] a, [class*='pager'] a",
        )
        .unwrap()
    });

    document
        .select(sel)
        .filter_map(|a| a.text().collect::<String>().trim().parse::<u32>().ok())
        .max()
}

fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}

fn normalize_image_url(base_url: &str, src: &str) -> String {
    let mut url = absolutize(base_url, src);
    // Shopify-style responsive templates carry a literal {width} placeholder
    if url.contains("{width}") {
        url = url.replace("{width}", "800");
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SourceRegistry;

    fn nordic_page() -> &'static str {
        r#"
        <html><body>
          <ul>
            <li class="grid__item product-card-wrapper">
              <h3 class="card__heading"><a href="/products/navy-overshirt?variant=1">Navy Wool Overshirt</a></h3>
              <div class="card__vendor">Fjell</div>
              <span class="price-item--regular">$129.00</span>
              <img class="responsive-image__image" data-src="//cdn.nordicthread.com/navy-overshirt_{width}.jpg" />
            </li>
            <li class="grid__item product-card-wrapper">
              <h3 class="card__heading"><a href="/products/linen-tee">Linen Tee</a></h3>
              <span class="price-item--regular">$45.00</span>
              <span class="price-item--sale">$29.00</span>
              <img class="responsive-image__image" src="/images/linen-tee.jpg" />
            </li>
          </ul>
          <nav class="pagination">
            <a href="?page=1">1</a><a href="?page=2">2</a><a href="?page=3">3</a>
            <a href="?page=2">Next</a>
          </nav>
        </body></html>
        "#
    }

    #[test]
    fn retailer_selectors_extract_products() {
        let registry = SourceRegistry::with_defaults();
        let config = registry.resolve("nordic-thread");

        let page = parse_listing(
            config,
            nordic_page(),
            "https://www.nordicthread.com/collections/tops",
            Some("tops"),
        )
        .unwrap();

        assert_eq!(page.products.len(), 2);
        assert_eq!(page.total_pages, Some(3));

        let overshirt = &page.products[0];
        assert_eq!(overshirt.name, "Navy Wool Overshirt");
        assert_eq!(overshirt.brand, "Fjell");
        assert_eq!(overshirt.price, 129.0);
        assert_eq!(overshirt.colors, vec!["navy"]);
        assert_eq!(overshirt.category, "tops");
        assert!(overshirt.id.starts_with("nordic-thread_"));
        assert!(!overshirt.url.contains('?'));
        assert_eq!(
            overshirt.image_urls[0],
            "https://cdn.nordicthread.com/navy-overshirt_800.jpg"
        );

        let tee = &page.products[1];
        assert_eq!(tee.sale_price, Some(29.0));
        assert!(tee.sale_price.unwrap() < tee.price);
    }

    #[test]
    fn unknown_markup_falls_back_to_generic_selectors() {
        let registry = SourceRegistry::with_defaults();
        let config = registry.resolve("nordic-thread");

        // No nordic classes; a common storefront theme instead
        let html = r#"
        <div class="product-card">
          <h3 class="product-name"><a href="/p/901">Relaxed Chino</a></h3>
          <span class="current-price">$59.50</span>
          <a href="/p/901"><img src="/img/901.jpg" /></a>
        </div>
        "#;

        let page = parse_listing(config, html, "https://x.test/bottoms", Some("bottoms")).unwrap();
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].price, 59.5);
        assert_eq!(page.products[0].fit, "relaxed");
    }

    #[test]
    fn bare_markup_falls_back_to_heuristic() {
        let registry = SourceRegistry::with_defaults();
        let config = registry.resolve("nordic-thread");

        let html = r#"
        <main>
          <a href="/shop/item-77">
            <img src="/img/77.jpg" alt="Charcoal Merino Beanie" />
            <span>Charcoal Merino Beanie — $24.00</span>
          </a>
          <a href="/about"><span>About us</span></a>
        </main>
        "#;

        let page =
            parse_listing(config, html, "https://x.test/accessories", Some("accessories")).unwrap();
        assert_eq!(page.products.len(), 1);
        assert_eq!(page.products[0].name, "Charcoal Merino Beanie");
        assert_eq!(page.products[0].price, 24.0);
        assert_eq!(page.products[0].colors, vec!["charcoal"]);
    }

    #[test]
    fn pageful_of_nothing_is_a_parse_error() {
        let registry = SourceRegistry::with_defaults();
        let config = registry.resolve("nordic-thread");

        let result = parse_listing(config, "<html><body><p>maintenance</p></body></html>", "https://x.test/tops", Some("tops"));
        assert!(matches!(result, Err(StylistError::Parse { .. })));
    }

    #[test]
    fn duplicate_urls_collapse_within_a_page() {
        let registry = SourceRegistry::with_defaults();
        let config = registry.resolve("nordic-thread");

        let html = r#"
        <li class="product-card-wrapper">
          <h3 class="card__heading"><a href="/products/tee?color=a">Tee</a></h3>
          <span class="price-item--regular">$20.00</span>
        </li>
        <li class="product-card-wrapper">
          <h3 class="card__heading"><a href="/products/tee?color=b">Tee</a></h3>
          <span class="price-item--regular">$20.00</span>
        </li>
        "#;

        let page = parse_listing(config, html, "https://x.test/tops", Some("tops")).unwrap();
        assert_eq!(page.products.len(), 1);
    }
}
