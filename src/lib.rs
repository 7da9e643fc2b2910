//! Core recommendation engine: aggregates product listings from retailer
//! APIs and storefront pages, normalizes them into one schema, scores them
//! against a user style profile, and assembles outfit suggestions.

pub mod cache;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod outfits;
pub mod profile;
pub mod registry;
pub mod scoring;
pub mod sources;
pub mod traits;

pub use engine::{Stylist, StylistConfig};
pub use error::StylistError;
pub use models::{
    Outfit, Product, RecommendationRequest, RecommendationResponse, ScoredProduct,
    UserStyleProfile,
};
pub use registry::SourceRegistry;
