use anyhow::Result;
use tracing::info;

use stylist_core::{RecommendationRequest, Stylist, StylistConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting stylist-core demo");

    let stylist = Stylist::new(StylistConfig::default())?;

    let request = RecommendationRequest {
        category: Some("tops".to_string()),
        occasion: Some("business".to_string()),
        limit: Some(10),
        ..Default::default()
    };

    let response = stylist.recommend(request).await?;

    info!(
        items = response.items.len(),
        outfits = response.outfits.len(),
        "recommendation complete"
    );
    for item in &response.items {
        info!(
            score = format!("{:.2}", item.match_score),
            retailer = %item.product.retailer_id,
            "{} ({})",
            item.product.name,
            item.product.category
        );
    }
    for outfit in &response.outfits {
        info!(
            score = format!("{:.2}", outfit.score),
            members = outfit.item_ids.len(),
            "{}",
            outfit.name
        );
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
