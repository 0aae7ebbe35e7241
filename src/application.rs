//! Application layer module
//!
//! Use cases that orchestrate the domain types over the infrastructure:
//! locating a product page per site and aggregating prices across sites.

pub mod price_scraper;
pub mod product_locator;

pub use price_scraper::PriceScraper;
pub use product_locator::{Located, ProductLocator};
